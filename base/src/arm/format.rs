//! Disassembly of ARM instructions in unified assembler syntax.
use std::fmt::{self, Display, Formatter};

use super::operation::{
    HalfwordKind, HalfwordOffset, Indexing, Operation, Register, ShiftAmount, ShiftKind,
    ShifterOperand, TransferOffset,
};
use super::Instruction;

impl Display for ShifterOperand {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ShifterOperand::Immediate { .. } => {
                write!(f, "#{:#X}", self.immediate_value().unwrap_or_default())
            }
            ShifterOperand::Register { rm, shift, amount } => {
                write!(f, "{rm}")?;
                match (shift, amount) {
                    (ShiftKind::Lsl, ShiftAmount::Immediate(0)) => Ok(()),
                    (ShiftKind::Ror, ShiftAmount::Immediate(0)) => f.write_str(", RRX"),
                    (ShiftKind::Lsr | ShiftKind::Asr, ShiftAmount::Immediate(0)) => {
                        write!(f, ", {} #32", shift_name(*shift))
                    }
                    (_, ShiftAmount::Immediate(n)) => write!(f, ", {} #{n}", shift_name(*shift)),
                    (_, ShiftAmount::Register(rs)) => write!(f, ", {} {rs}", shift_name(*shift)),
                }
            }
        }
    }
}

fn shift_name(shift: ShiftKind) -> &'static str {
    match shift {
        ShiftKind::Lsl => "LSL",
        ShiftKind::Lsr => "LSR",
        ShiftKind::Asr => "ASR",
        ShiftKind::Ror => "ROR",
    }
}

fn sign(indexing: &Indexing) -> &'static str {
    if indexing.add {
        ""
    } else {
        "-"
    }
}

/// Writes `[Rn, offset]{!}` or `[Rn], offset`.
fn address(
    f: &mut Formatter<'_>,
    rn: Register,
    indexing: &Indexing,
    offset: &str,
) -> Result<(), fmt::Error> {
    match (indexing.pre_index, offset.is_empty()) {
        (true, true) => write!(f, "[{rn}]"),
        (true, false) => write!(
            f,
            "[{rn}, {offset}]{}",
            if indexing.write_back { "!" } else { "" }
        ),
        (false, true) => write!(f, "[{rn}]"),
        (false, false) => write!(f, "[{rn}], {offset}"),
    }
}

fn register_list(registers: u16) -> String {
    let names: Vec<String> = (0..16)
        .filter(|n| registers & (1 << n) != 0)
        .map(|n| Register::new(n).to_string())
        .collect();
    format!("{{{}}}", names.join(", "))
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let cond = self.condition().suffix();
        match *self.operation() {
            Operation::DataProcessing {
                op,
                set_flags,
                rn,
                rd,
                operand,
            } => {
                let s = if set_flags && !op.is_comparison() {
                    "S"
                } else {
                    ""
                };
                let mnemonic = op.mnemonic();
                if op.is_comparison() {
                    write!(f, "{mnemonic}{cond} {rn}, {operand}")
                } else if op.is_move() {
                    write!(f, "{mnemonic}{s}{cond} {rd}, {operand}")
                } else {
                    write!(f, "{mnemonic}{s}{cond} {rd}, {rn}, {operand}")
                }
            }
            Operation::MoveWide { top, rd, imm16 } => {
                let mnemonic = if top { "MOVT" } else { "MOVW" };
                write!(f, "{mnemonic}{cond} {rd}, #{imm16:#X}")
            }
            Operation::Multiply {
                accumulate,
                set_flags,
                rd,
                rn,
                rs,
                rm,
            } => {
                let s = if set_flags { "S" } else { "" };
                if accumulate {
                    write!(f, "MLA{s}{cond} {rd}, {rm}, {rs}, {rn}")
                } else {
                    write!(f, "MUL{s}{cond} {rd}, {rm}, {rs}")
                }
            }
            Operation::MultiplyLong {
                signed,
                accumulate,
                set_flags,
                rd_hi,
                rd_lo,
                rs,
                rm,
            } => {
                let mnemonic = match (signed, accumulate) {
                    (false, false) => "UMULL",
                    (false, true) => "UMLAL",
                    (true, false) => "SMULL",
                    (true, true) => "SMLAL",
                };
                let s = if set_flags { "S" } else { "" };
                write!(f, "{mnemonic}{s}{cond} {rd_lo}, {rd_hi}, {rm}, {rs}")
            }
            Operation::Swap { byte, rn, rd, rm } => {
                let b = if byte { "B" } else { "" };
                write!(f, "SWP{b}{cond} {rd}, {rm}, [{rn}]")
            }
            Operation::StatusToRegister { saved, rd } => {
                write!(f, "MRS{cond} {rd}, {}", if saved { "SPSR" } else { "CPSR" })
            }
            Operation::RegisterToStatus {
                saved,
                mask,
                operand,
            } => {
                let psr = if saved { "SPSR" } else { "CPSR" };
                let fields: String = [(8, 'f'), (4, 's'), (2, 'x'), (1, 'c')]
                    .iter()
                    .filter(|(m, _)| mask & m != 0)
                    .map(|(_, c)| *c)
                    .collect();
                write!(f, "MSR{cond} {psr}_{fields}, {operand}")
            }
            Operation::BranchExchange { link, rm } => {
                let mnemonic = if link { "BLX" } else { "BX" };
                write!(f, "{mnemonic}{cond} {rm}")
            }
            Operation::CountLeadingZeros { rd, rm } => write!(f, "CLZ{cond} {rd}, {rm}"),
            Operation::SingleTransfer {
                load,
                byte,
                indexing,
                rn,
                rd,
                offset,
            } => {
                let mnemonic = if load { "LDR" } else { "STR" };
                let b = if byte { "B" } else { "" };
                let offset = match offset {
                    TransferOffset::Immediate(0) => String::new(),
                    TransferOffset::Immediate(n) => format!("#{}{n:#X}", sign(&indexing)),
                    TransferOffset::Register { rm, shift, amount } => {
                        let shifted = ShifterOperand::Register {
                            rm,
                            shift,
                            amount: ShiftAmount::Immediate(amount),
                        };
                        format!("{}{shifted}", sign(&indexing))
                    }
                };
                write!(f, "{mnemonic}{b}{cond} {rd}, ")?;
                address(f, rn, &indexing, &offset)
            }
            Operation::HalfwordTransfer {
                load,
                kind,
                indexing,
                rn,
                rd,
                offset,
            } => {
                let mnemonic = match (load, kind) {
                    (true, HalfwordKind::UnsignedHalf) => "LDRH",
                    (false, HalfwordKind::UnsignedHalf) => "STRH",
                    (_, HalfwordKind::SignedByte) => "LDRSB",
                    (_, HalfwordKind::SignedHalf) => "LDRSH",
                    (true, HalfwordKind::Double) => "LDRD",
                    (false, HalfwordKind::Double) => "STRD",
                };
                let offset = match offset {
                    HalfwordOffset::Immediate(0) => String::new(),
                    HalfwordOffset::Immediate(n) => format!("#{}{n:#X}", sign(&indexing)),
                    HalfwordOffset::Register(rm) => format!("{}{rm}", sign(&indexing)),
                };
                write!(f, "{mnemonic}{cond} {rd}, ")?;
                address(f, rn, &indexing, &offset)
            }
            Operation::BlockTransfer {
                load,
                indexing,
                user_bank,
                rn,
                registers,
            } => {
                let mnemonic = if load { "LDM" } else { "STM" };
                let mode = match (indexing.add, indexing.pre_index) {
                    (true, false) => "IA",
                    (true, true) => "IB",
                    (false, false) => "DA",
                    (false, true) => "DB",
                };
                let bang = if indexing.write_back { "!" } else { "" };
                let caret = if user_bank { "^" } else { "" };
                write!(
                    f,
                    "{mnemonic}{mode}{cond} {rn}{bang}, {}{caret}",
                    register_list(registers)
                )
            }
            Operation::Branch { link, offset } => {
                let mnemonic = if link { "BL" } else { "B" };
                write!(f, "{mnemonic}{cond} {}", relative(offset))
            }
            Operation::BranchLinkExchange { offset } => write!(f, "BLX {}", relative(offset)),
            Operation::SupervisorCall { comment } => write!(f, "SVC{cond} #{comment:#X}"),
            Operation::Breakpoint { comment } => write!(f, "BKPT #{comment:#X}"),
            Operation::Coprocessor { word } => write!(f, "(coprocessor) {word:#010X}"),
            Operation::Media { word } => write!(f, "(media) {word:#010X}"),
            Operation::Unconditional { word } | Operation::Undefined { word } => {
                write!(f, "(undefined) {word:#010X}")
            }
        }
    }
}

/// Branch targets are shown relative to the instruction itself, which
/// sees the program counter 8 bytes ahead.
fn relative(offset: i32) -> String {
    let from_here = i64::from(offset) + 8;
    if from_here < 0 {
        format!("$-{:#X}", -from_here)
    } else {
        format!("$+{from_here:#X}")
    }
}
