//! Operations of decoded ARM (A32) instructions.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

/// One of the sixteen core registers.  R13-R15 have the conventional
/// names SP, LR and PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Register(u8);

impl Register {
    pub const SP: Register = Register(13);
    pub const LR: Register = Register(14);
    pub const PC: Register = Register(15);

    /// Takes the low four bits of `n`.
    #[must_use]
    pub const fn new(n: u32) -> Register {
        Register((n & 0xF) as u8)
    }

    #[must_use]
    pub const fn number(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_pc(self) -> bool {
        self.0 == 15
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self.0 {
            13 => f.write_str("SP"),
            14 => f.write_str("LR"),
            15 => f.write_str("PC"),
            n => write!(f, "R{n}"),
        }
    }
}

/// The condition field, bits 31-28.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    Eq,
    Ne,
    Cs,
    Cc,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Always,
    /// 0b1111: the unconditional instruction space.
    Unconditional,
}

impl Condition {
    const ALL: [Condition; 16] = [
        Condition::Eq,
        Condition::Ne,
        Condition::Cs,
        Condition::Cc,
        Condition::Mi,
        Condition::Pl,
        Condition::Vs,
        Condition::Vc,
        Condition::Hi,
        Condition::Ls,
        Condition::Ge,
        Condition::Lt,
        Condition::Gt,
        Condition::Le,
        Condition::Always,
        Condition::Unconditional,
    ];

    #[must_use]
    pub const fn from_field(n: u32) -> Condition {
        Condition::ALL[(n & 0xF) as usize]
    }

    #[must_use]
    pub const fn field(self) -> u32 {
        self as u32
    }

    /// Evaluates the condition against the N, Z, C and V flags.
    #[must_use]
    pub const fn holds(self, n: bool, z: bool, c: bool, v: bool) -> bool {
        match self {
            Condition::Eq => z,
            Condition::Ne => !z,
            Condition::Cs => c,
            Condition::Cc => !c,
            Condition::Mi => n,
            Condition::Pl => !n,
            Condition::Vs => v,
            Condition::Vc => !v,
            Condition::Hi => c && !z,
            Condition::Ls => !c || z,
            Condition::Ge => n == v,
            Condition::Lt => n != v,
            Condition::Gt => !z && n == v,
            Condition::Le => z || n != v,
            Condition::Always | Condition::Unconditional => true,
        }
    }

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Condition::Eq => "EQ",
            Condition::Ne => "NE",
            Condition::Cs => "CS",
            Condition::Cc => "CC",
            Condition::Mi => "MI",
            Condition::Pl => "PL",
            Condition::Vs => "VS",
            Condition::Vc => "VC",
            Condition::Hi => "HI",
            Condition::Ls => "LS",
            Condition::Ge => "GE",
            Condition::Lt => "LT",
            Condition::Gt => "GT",
            Condition::Le => "LE",
            Condition::Always | Condition::Unconditional => "",
        }
    }
}

/// Data-processing opcodes, bits 24-21.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl DataOp {
    const ALL: [DataOp; 16] = [
        DataOp::And,
        DataOp::Eor,
        DataOp::Sub,
        DataOp::Rsb,
        DataOp::Add,
        DataOp::Adc,
        DataOp::Sbc,
        DataOp::Rsc,
        DataOp::Tst,
        DataOp::Teq,
        DataOp::Cmp,
        DataOp::Cmn,
        DataOp::Orr,
        DataOp::Mov,
        DataOp::Bic,
        DataOp::Mvn,
    ];

    #[must_use]
    pub const fn from_field(n: u32) -> DataOp {
        DataOp::ALL[(n & 0xF) as usize]
    }

    /// TST, TEQ, CMP and CMN only set flags.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, DataOp::Tst | DataOp::Teq | DataOp::Cmp | DataOp::Cmn)
    }

    /// MOV and MVN ignore Rn.
    #[must_use]
    pub const fn is_move(self) -> bool {
        matches!(self, DataOp::Mov | DataOp::Mvn)
    }

    /// Logical operations take their carry flag from the shifter.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(
            self,
            DataOp::And
                | DataOp::Eor
                | DataOp::Tst
                | DataOp::Teq
                | DataOp::Orr
                | DataOp::Mov
                | DataOp::Bic
                | DataOp::Mvn
        )
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            DataOp::And => "AND",
            DataOp::Eor => "EOR",
            DataOp::Sub => "SUB",
            DataOp::Rsb => "RSB",
            DataOp::Add => "ADD",
            DataOp::Adc => "ADC",
            DataOp::Sbc => "SBC",
            DataOp::Rsc => "RSC",
            DataOp::Tst => "TST",
            DataOp::Teq => "TEQ",
            DataOp::Cmp => "CMP",
            DataOp::Cmn => "CMN",
            DataOp::Orr => "ORR",
            DataOp::Mov => "MOV",
            DataOp::Bic => "BIC",
            DataOp::Mvn => "MVN",
        }
    }
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    /// ROR, or RRX when the immediate shift amount is zero.
    Ror,
}

impl ShiftKind {
    #[must_use]
    pub const fn from_field(n: u32) -> ShiftKind {
        match n & 3 {
            0 => ShiftKind::Lsl,
            1 => ShiftKind::Lsr,
            2 => ShiftKind::Asr,
            _ => ShiftKind::Ror,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShiftAmount {
    Immediate(u8),
    Register(Register),
}

/// The flexible second operand of data-processing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShifterOperand {
    /// An 8-bit value rotated right by twice the 4-bit rotate field.
    Immediate { imm8: u8, rotate: u8 },
    Register {
        rm: Register,
        shift: ShiftKind,
        amount: ShiftAmount,
    },
}

impl ShifterOperand {
    /// The value of an immediate operand, if this is one.
    #[must_use]
    pub const fn immediate_value(&self) -> Option<u32> {
        match self {
            ShifterOperand::Immediate { imm8, rotate } => {
                Some((*imm8 as u32).rotate_right(2 * (*rotate as u32)))
            }
            ShifterOperand::Register { .. } => None,
        }
    }
}

/// Offset of a word or unsigned-byte load/store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransferOffset {
    Immediate(u16),
    Register {
        rm: Register,
        shift: ShiftKind,
        amount: u8,
    },
}

/// Offset of a halfword or signed load/store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HalfwordOffset {
    Immediate(u8),
    Register(Register),
}

/// Addressing behaviour shared by the load/store forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Indexing {
    /// P: apply the offset before the transfer.
    pub pre_index: bool,
    /// U: add (rather than subtract) the offset.
    pub add: bool,
    /// W: write the address back to the base register.
    pub write_back: bool,
}

impl Indexing {
    pub(crate) const fn from_word(word: u32) -> Indexing {
        Indexing {
            pre_index: word & (1 << 24) != 0,
            add: word & (1 << 23) != 0,
            write_back: word & (1 << 21) != 0,
        }
    }

    /// Post-indexed transfers always write back.
    #[must_use]
    pub const fn writes_back(&self) -> bool {
        self.write_back || !self.pre_index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HalfwordKind {
    UnsignedHalf,
    SignedByte,
    SignedHalf,
    /// LDRD/STRD.
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    DataProcessing {
        op: DataOp,
        set_flags: bool,
        rn: Register,
        rd: Register,
        operand: ShifterOperand,
    },
    /// MOVW (`top` false) and MOVT (`top` true).
    MoveWide {
        top: bool,
        rd: Register,
        imm16: u16,
    },
    Multiply {
        accumulate: bool,
        set_flags: bool,
        rd: Register,
        rn: Register,
        rs: Register,
        rm: Register,
    },
    MultiplyLong {
        signed: bool,
        accumulate: bool,
        set_flags: bool,
        rd_hi: Register,
        rd_lo: Register,
        rs: Register,
        rm: Register,
    },
    Swap {
        byte: bool,
        rn: Register,
        rd: Register,
        rm: Register,
    },
    /// MRS
    StatusToRegister { saved: bool, rd: Register },
    /// MSR
    RegisterToStatus {
        saved: bool,
        mask: u8,
        operand: ShifterOperand,
    },
    BranchExchange {
        link: bool,
        rm: Register,
    },
    CountLeadingZeros {
        rd: Register,
        rm: Register,
    },
    SingleTransfer {
        load: bool,
        byte: bool,
        indexing: Indexing,
        rn: Register,
        rd: Register,
        offset: TransferOffset,
    },
    HalfwordTransfer {
        load: bool,
        kind: HalfwordKind,
        indexing: Indexing,
        rn: Register,
        rd: Register,
        offset: HalfwordOffset,
    },
    BlockTransfer {
        load: bool,
        indexing: Indexing,
        user_bank: bool,
        rn: Register,
        registers: u16,
    },
    /// B and BL.  The offset is relative to the address of the
    /// instruction plus 8.
    Branch { link: bool, offset: i32 },
    /// BLX with an immediate target (switches to Thumb state).
    BranchLinkExchange { offset: i32 },
    SupervisorCall { comment: u32 },
    Breakpoint { comment: u16 },
    /// Coprocessor instructions are recognised but not modeled.
    Coprocessor { word: u32 },
    /// Media instructions are recognised but not modeled.
    Media { word: u32 },
    /// Other instructions in the unconditional space.
    Unconditional { word: u32 },
    Undefined { word: u32 },
}
