//! The operations an 8086 instruction can perform.
//!
//! Every recognised encoding decodes to exactly one [`Operation`]
//! variant, carrying just the operands that variant needs.  Unknown
//! or reserved encodings decode to [`Operation::Unknown`].
use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

use crate::width::Width;

use super::operand::{EffectiveAddress, Operand, Port};
use super::registers::{SegmentRegister, WordRegister};

/// The eight two-operand arithmetic and logic operations, in the
/// order used both by opcode bits 5-3 and by the `reg` field of the
/// 0x80-0x83 group.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArithOp {
    Add,
    Or,
    Adc,
    Sbb,
    And,
    Sub,
    Xor,
    Cmp,
}

impl ArithOp {
    const ALL: [ArithOp; 8] = [
        ArithOp::Add,
        ArithOp::Or,
        ArithOp::Adc,
        ArithOp::Sbb,
        ArithOp::And,
        ArithOp::Sub,
        ArithOp::Xor,
        ArithOp::Cmp,
    ];

    #[must_use]
    pub const fn from_index(n: u8) -> ArithOp {
        ArithOp::ALL[(n & 7) as usize]
    }

    /// CMP computes flags but discards the result.
    #[must_use]
    pub const fn writes_result(self) -> bool {
        !matches!(self, ArithOp::Cmp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IncDecOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MulDivOp {
    Mul,
    Imul,
    Div,
    Idiv,
}

/// Rotates and shifts.  The `reg` encoding 110 is unassigned on the
/// 8086 and so has no variant here.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShiftOp {
    Rol,
    Ror,
    Rcl,
    Rcr,
    Shl,
    Shr,
    Sar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShiftCount {
    One,
    Cl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StringOp {
    Movs,
    Cmps,
    Stos,
    Lods,
    Scas,
}

impl StringOp {
    /// CMPS and SCAS terminate a repeat early depending on ZF.
    #[must_use]
    pub const fn compares(self) -> bool {
        matches!(self, StringOp::Cmps | StringOp::Scas)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AdjustOp {
    Daa,
    Das,
    Aaa,
    Aas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlagOp {
    Clc,
    Stc,
    Cmc,
    Cli,
    Sti,
    Cld,
    Std,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoopOp {
    Loopne,
    Loope,
    Loop,
    Jcxz,
}

/// Branch conditions, in the order of the low nibble of the Jcc
/// opcodes 0x70-0x7F.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    Overflow,
    NotOverflow,
    Below,
    AboveOrEqual,
    Equal,
    NotEqual,
    BelowOrEqual,
    Above,
    Sign,
    NotSign,
    Parity,
    NotParity,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Greater,
}

impl Condition {
    const ALL: [Condition; 16] = [
        Condition::Overflow,
        Condition::NotOverflow,
        Condition::Below,
        Condition::AboveOrEqual,
        Condition::Equal,
        Condition::NotEqual,
        Condition::BelowOrEqual,
        Condition::Above,
        Condition::Sign,
        Condition::NotSign,
        Condition::Parity,
        Condition::NotParity,
        Condition::Less,
        Condition::GreaterOrEqual,
        Condition::LessOrEqual,
        Condition::Greater,
    ];

    #[must_use]
    pub const fn from_index(n: u8) -> Condition {
        Condition::ALL[(n & 0xF) as usize]
    }

    /// Odd-numbered conditions are the negation of the one before.
    #[must_use]
    pub const fn is_negated(self) -> bool {
        (self as u8) & 1 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Arith {
        op: ArithOp,
        width: Width,
        dst: Operand,
        src: Operand,
    },
    Test {
        width: Width,
        dst: Operand,
        src: Operand,
    },
    IncDec {
        op: IncDecOp,
        width: Width,
        target: Operand,
    },
    Unary {
        op: UnaryOp,
        width: Width,
        target: Operand,
    },
    MulDiv {
        op: MulDivOp,
        width: Width,
        source: Operand,
    },
    Shift {
        op: ShiftOp,
        width: Width,
        target: Operand,
        count: ShiftCount,
    },
    Mov {
        width: Width,
        dst: Operand,
        src: Operand,
    },
    Xchg {
        width: Width,
        a: Operand,
        b: Operand,
    },
    Lea {
        dst: WordRegister,
        address: EffectiveAddress,
    },
    /// LDS and LES.
    LoadFarPointer {
        segment: SegmentRegister,
        dst: WordRegister,
        address: EffectiveAddress,
    },
    Push(Operand),
    Pop(Operand),
    PushFlags,
    PopFlags,
    StoreAhIntoFlags,
    LoadAhFromFlags,
    ConvertByteToWord,
    ConvertWordToDouble,
    Translate,
    Adjust(AdjustOp),
    AsciiAdjustMultiply {
        base: u8,
    },
    AsciiAdjustDivide {
        base: u8,
    },
    JumpConditional {
        condition: Condition,
        displacement: i8,
    },
    JumpRelative {
        displacement: i16,
    },
    JumpFar {
        segment: u16,
        offset: u16,
    },
    JumpIndirect {
        target: Operand,
    },
    JumpFarIndirect {
        address: EffectiveAddress,
    },
    CallRelative {
        displacement: i16,
    },
    CallFar {
        segment: u16,
        offset: u16,
    },
    CallIndirect {
        target: Operand,
    },
    CallFarIndirect {
        address: EffectiveAddress,
    },
    Return {
        pop: u16,
    },
    ReturnFar {
        pop: u16,
    },
    Loop {
        op: LoopOp,
        displacement: i8,
    },
    Interrupt {
        vector: u8,
    },
    InterruptOnOverflow,
    InterruptReturn,
    String {
        op: StringOp,
        width: Width,
    },
    In {
        width: Width,
        port: Port,
    },
    Out {
        width: Width,
        port: Port,
    },
    Flag(FlagOp),
    Halt,
    Wait,
    /// Escape to a coprocessor.  The operand is computed (and so
    /// its bytes consumed) but otherwise ignored.
    Escape {
        opcode: u8,
        operand: Operand,
    },
    Unknown,
}

impl Operation {
    #[must_use]
    pub const fn writes_program_counter(&self) -> bool {
        matches!(
            self,
            Operation::JumpConditional { .. }
                | Operation::JumpRelative { .. }
                | Operation::JumpFar { .. }
                | Operation::JumpIndirect { .. }
                | Operation::JumpFarIndirect { .. }
                | Operation::CallRelative { .. }
                | Operation::CallFar { .. }
                | Operation::CallIndirect { .. }
                | Operation::CallFarIndirect { .. }
                | Operation::Return { .. }
                | Operation::ReturnFar { .. }
                | Operation::Loop { .. }
                | Operation::Interrupt { .. }
                | Operation::InterruptOnOverflow
                | Operation::InterruptReturn
        )
    }

    #[must_use]
    pub const fn has_static_target(&self) -> bool {
        matches!(
            self,
            Operation::JumpConditional { .. }
                | Operation::JumpRelative { .. }
                | Operation::JumpFar { .. }
                | Operation::CallRelative { .. }
                | Operation::CallFar { .. }
                | Operation::Loop { .. }
        )
    }
}
