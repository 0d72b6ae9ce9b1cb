//! Disassembly of decoded 8086 instructions, in Intel syntax.
use std::fmt::{self, Display, Formatter};

use crate::width::Width;

use super::operand::{AddressBase, EffectiveAddress, Operand, Port};
use super::operation::{
    AdjustOp, ArithOp, Condition, FlagOp, IncDecOp, LoopOp, MulDivOp, Operation, ShiftCount,
    ShiftOp, StringOp, UnaryOp,
};
use super::prefix::Repeat;
use super::registers::SegmentRegister;
use super::Instruction;

impl ArithOp {
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "ADD",
            ArithOp::Or => "OR",
            ArithOp::Adc => "ADC",
            ArithOp::Sbb => "SBB",
            ArithOp::And => "AND",
            ArithOp::Sub => "SUB",
            ArithOp::Xor => "XOR",
            ArithOp::Cmp => "CMP",
        }
    }
}

impl ShiftOp {
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            ShiftOp::Rol => "ROL",
            ShiftOp::Ror => "ROR",
            ShiftOp::Rcl => "RCL",
            ShiftOp::Rcr => "RCR",
            ShiftOp::Shl => "SHL",
            ShiftOp::Shr => "SHR",
            ShiftOp::Sar => "SAR",
        }
    }
}

impl Condition {
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Condition::Overflow => "JO",
            Condition::NotOverflow => "JNO",
            Condition::Below => "JB",
            Condition::AboveOrEqual => "JAE",
            Condition::Equal => "JE",
            Condition::NotEqual => "JNE",
            Condition::BelowOrEqual => "JBE",
            Condition::Above => "JA",
            Condition::Sign => "JS",
            Condition::NotSign => "JNS",
            Condition::Parity => "JP",
            Condition::NotParity => "JNP",
            Condition::Less => "JL",
            Condition::GreaterOrEqual => "JGE",
            Condition::LessOrEqual => "JLE",
            Condition::Greater => "JG",
        }
    }
}

impl StringOp {
    #[must_use]
    pub const fn mnemonic(self, width: Width) -> &'static str {
        match (self, width) {
            (StringOp::Movs, Width::Byte) => "MOVSB",
            (StringOp::Movs, Width::Word) => "MOVSW",
            (StringOp::Cmps, Width::Byte) => "CMPSB",
            (StringOp::Cmps, Width::Word) => "CMPSW",
            (StringOp::Stos, Width::Byte) => "STOSB",
            (StringOp::Stos, Width::Word) => "STOSW",
            (StringOp::Lods, Width::Byte) => "LODSB",
            (StringOp::Lods, Width::Word) => "LODSW",
            (StringOp::Scas, Width::Byte) => "SCASB",
            (StringOp::Scas, Width::Word) => "SCASW",
        }
    }
}

impl Display for AddressBase {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            AddressBase::BxSi => "BX+SI",
            AddressBase::BxDi => "BX+DI",
            AddressBase::BpSi => "BP+SI",
            AddressBase::BpDi => "BP+DI",
            AddressBase::Si => "SI",
            AddressBase::Di => "DI",
            AddressBase::Bp => "BP",
            AddressBase::Bx => "BX",
            AddressBase::Direct => "",
        })
    }
}

impl Display for EffectiveAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match (self.base, self.displacement_bytes) {
            (AddressBase::Direct, _) => write!(f, "[0x{:04X}]", self.displacement),
            (base, 0) => write!(f, "[{base}]"),
            (base, 1) => {
                let d = self.displacement as i16;
                if d < 0 {
                    write!(f, "[{base}-0x{:02X}]", -i32::from(d))
                } else {
                    write!(f, "[{base}+0x{d:02X}]")
                }
            }
            (base, _) => write!(f, "[{base}+0x{:04X}]", self.displacement),
        }
    }
}

/// Formats an operand within the context of an instruction (which
/// supplies the segment override and operand width).
struct OperandInContext<'a> {
    operand: &'a Operand,
    width: Width,
    segment: Option<SegmentRegister>,
    show_size: bool,
}

impl Display for OperandInContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self.operand {
            Operand::Register(r) => r.fmt(f),
            Operand::Segment(s) => s.fmt(f),
            Operand::Immediate(value) => match self.width {
                Width::Byte => write!(f, "0x{:02X}", value & 0xFF),
                Width::Word => write!(f, "0x{value:04X}"),
            },
            Operand::Memory(address) => {
                if self.show_size {
                    write!(f, "{} PTR ", self.width)?;
                }
                if let Some(seg) = self.segment {
                    write!(f, "{seg}:")?;
                }
                address.fmt(f)
            }
        }
    }
}

fn relative(f: &mut Formatter<'_>, mnemonic: &str, length: usize, displacement: i32) -> fmt::Result {
    let offset = displacement + length as i32;
    if offset < 0 {
        write!(f, "{mnemonic} $-0x{:X}", -offset)
    } else {
        write!(f, "{mnemonic} $+0x{offset:X}")
    }
}

impl Instruction {
    fn operand<'a>(
        &self,
        operand: &'a Operand,
        width: Width,
        show_size: bool,
    ) -> OperandInContext<'a> {
        OperandInContext {
            operand,
            width,
            segment: self.prefixes().segment,
            show_size,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let prefixes = self.prefixes();
        if prefixes.lock {
            f.write_str("LOCK ")?;
        }
        match self.operation() {
            Operation::String { op, width } => {
                match (prefixes.repeat, op.compares()) {
                    (Some(Repeat::Equal), false) => f.write_str("REP ")?,
                    (Some(Repeat::Equal), true) => f.write_str("REPE ")?,
                    (Some(Repeat::NotEqual), _) => f.write_str("REPNE ")?,
                    (None, _) => (),
                }
                f.write_str(op.mnemonic(*width))?;
                if let Some(seg) = prefixes.segment {
                    if matches!(op, StringOp::Movs | StringOp::Cmps | StringOp::Lods) {
                        write!(f, " {seg}:[SI]")?;
                    }
                }
                Ok(())
            }
            Operation::Arith { op, width, dst, src } => {
                let sized = !src.is_register() && !dst.is_register();
                write!(
                    f,
                    "{} {}, {}",
                    op.mnemonic(),
                    self.operand(dst, *width, sized),
                    self.operand(src, *width, false)
                )
            }
            Operation::Test { width, dst, src } => {
                let sized = !src.is_register() && !dst.is_register();
                write!(
                    f,
                    "TEST {}, {}",
                    self.operand(dst, *width, sized),
                    self.operand(src, *width, false)
                )
            }
            Operation::IncDec { op, width, target } => write!(
                f,
                "{} {}",
                match op {
                    IncDecOp::Inc => "INC",
                    IncDecOp::Dec => "DEC",
                },
                self.operand(target, *width, true)
            ),
            Operation::Unary { op, width, target } => write!(
                f,
                "{} {}",
                match op {
                    UnaryOp::Not => "NOT",
                    UnaryOp::Neg => "NEG",
                },
                self.operand(target, *width, true)
            ),
            Operation::MulDiv { op, width, source } => write!(
                f,
                "{} {}",
                match op {
                    MulDivOp::Mul => "MUL",
                    MulDivOp::Imul => "IMUL",
                    MulDivOp::Div => "DIV",
                    MulDivOp::Idiv => "IDIV",
                },
                self.operand(source, *width, true)
            ),
            Operation::Shift {
                op,
                width,
                target,
                count,
            } => write!(
                f,
                "{} {}, {}",
                op.mnemonic(),
                self.operand(target, *width, true),
                match count {
                    ShiftCount::One => "1",
                    ShiftCount::Cl => "CL",
                }
            ),
            Operation::Mov { width, dst, src } => {
                let sized = matches!(src, Operand::Immediate(_)) && dst.is_memory();
                write!(
                    f,
                    "MOV {}, {}",
                    self.operand(dst, *width, sized),
                    self.operand(src, *width, false)
                )
            }
            Operation::Xchg { width, a, b } => {
                if self.opcode() == 0x90 {
                    f.write_str("NOP")
                } else {
                    write!(
                        f,
                        "XCHG {}, {}",
                        self.operand(a, *width, false),
                        self.operand(b, *width, false)
                    )
                }
            }
            Operation::Lea { dst, address } => write!(f, "LEA {dst}, {address}"),
            Operation::LoadFarPointer {
                segment,
                dst,
                address,
            } => {
                let m = match segment {
                    SegmentRegister::ES => "LES",
                    _ => "LDS",
                };
                write!(
                    f,
                    "{m} {dst}, {}",
                    self.operand(&Operand::Memory(*address), Width::Word, false)
                )
            }
            Operation::Push(operand) => {
                write!(f, "PUSH {}", self.operand(operand, Width::Word, true))
            }
            Operation::Pop(operand) => write!(f, "POP {}", self.operand(operand, Width::Word, true)),
            Operation::PushFlags => f.write_str("PUSHF"),
            Operation::PopFlags => f.write_str("POPF"),
            Operation::StoreAhIntoFlags => f.write_str("SAHF"),
            Operation::LoadAhFromFlags => f.write_str("LAHF"),
            Operation::ConvertByteToWord => f.write_str("CBW"),
            Operation::ConvertWordToDouble => f.write_str("CWD"),
            Operation::Translate => f.write_str("XLAT"),
            Operation::Adjust(op) => f.write_str(match op {
                AdjustOp::Daa => "DAA",
                AdjustOp::Das => "DAS",
                AdjustOp::Aaa => "AAA",
                AdjustOp::Aas => "AAS",
            }),
            Operation::AsciiAdjustMultiply { base: 10 } => f.write_str("AAM"),
            Operation::AsciiAdjustMultiply { base } => write!(f, "AAM 0x{base:02X}"),
            Operation::AsciiAdjustDivide { base: 10 } => f.write_str("AAD"),
            Operation::AsciiAdjustDivide { base } => write!(f, "AAD 0x{base:02X}"),
            Operation::JumpConditional {
                condition,
                displacement,
            } => relative(
                f,
                condition.mnemonic(),
                self.length,
                i32::from(*displacement),
            ),
            Operation::JumpRelative { displacement } => {
                relative(f, "JMP", self.length, i32::from(*displacement))
            }
            Operation::JumpFar { segment, offset } => {
                write!(f, "JMP FAR 0x{segment:04X}:0x{offset:04X}")
            }
            Operation::JumpIndirect { target } => {
                write!(f, "JMP {}", self.operand(target, Width::Word, true))
            }
            Operation::JumpFarIndirect { address } => write!(
                f,
                "JMP FAR {}",
                self.operand(&Operand::Memory(*address), Width::Word, false)
            ),
            Operation::CallRelative { displacement } => {
                relative(f, "CALL", self.length, i32::from(*displacement))
            }
            Operation::CallFar { segment, offset } => {
                write!(f, "CALL FAR 0x{segment:04X}:0x{offset:04X}")
            }
            Operation::CallIndirect { target } => {
                write!(f, "CALL {}", self.operand(target, Width::Word, true))
            }
            Operation::CallFarIndirect { address } => write!(
                f,
                "CALL FAR {}",
                self.operand(&Operand::Memory(*address), Width::Word, false)
            ),
            Operation::Return { pop: 0 } => f.write_str("RET"),
            Operation::Return { pop } => write!(f, "RET 0x{pop:04X}"),
            Operation::ReturnFar { pop: 0 } => f.write_str("RETF"),
            Operation::ReturnFar { pop } => write!(f, "RETF 0x{pop:04X}"),
            Operation::Loop { op, displacement } => relative(
                f,
                match op {
                    LoopOp::Loopne => "LOOPNE",
                    LoopOp::Loope => "LOOPE",
                    LoopOp::Loop => "LOOP",
                    LoopOp::Jcxz => "JCXZ",
                },
                self.length,
                i32::from(*displacement),
            ),
            Operation::Interrupt { vector: 3 } if self.opcode() == 0xCC => f.write_str("INT3"),
            Operation::Interrupt { vector } => write!(f, "INT 0x{vector:02X}"),
            Operation::InterruptOnOverflow => f.write_str("INTO"),
            Operation::InterruptReturn => f.write_str("IRET"),
            Operation::In { width, port } => {
                let acc = if *width == Width::Byte { "AL" } else { "AX" };
                match port {
                    Port::Immediate(p) => write!(f, "IN {acc}, 0x{p:02X}"),
                    Port::Dx => write!(f, "IN {acc}, DX"),
                }
            }
            Operation::Out { width, port } => {
                let acc = if *width == Width::Byte { "AL" } else { "AX" };
                match port {
                    Port::Immediate(p) => write!(f, "OUT 0x{p:02X}, {acc}"),
                    Port::Dx => write!(f, "OUT DX, {acc}"),
                }
            }
            Operation::Flag(op) => f.write_str(match op {
                FlagOp::Clc => "CLC",
                FlagOp::Stc => "STC",
                FlagOp::Cmc => "CMC",
                FlagOp::Cli => "CLI",
                FlagOp::Sti => "STI",
                FlagOp::Cld => "CLD",
                FlagOp::Std => "STD",
            }),
            Operation::Halt => f.write_str("HLT"),
            Operation::Wait => f.write_str("WAIT"),
            Operation::Escape { opcode, operand } => write!(
                f,
                "ESC 0x{opcode:02X}, {}",
                self.operand(operand, Width::Word, false)
            ),
            Operation::Unknown => write!(f, "(bad) 0x{:02X}", self.opcode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::x86::decode_slice;

    fn disassemble(bytes: &[u8]) -> String {
        decode_slice(bytes)
            .expect("test data should decode")
            .to_string()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(disassemble(&[0x2E, 0x26, 0x04, 0x05]), "ADD AL, 0x05");
        assert_eq!(disassemble(&[0x01, 0xD8]), "ADD AX, BX");
        assert_eq!(
            disassemble(&[0x80, 0x46, 0xFE, 0x01]),
            "ADD BYTE PTR [BP-0x02], 0x01"
        );
    }

    #[test]
    fn test_moves() {
        assert_eq!(disassemble(&[0xB8, 0x34, 0x12]), "MOV AX, 0x1234");
        assert_eq!(disassemble(&[0x26, 0x8B, 0x07]), "MOV AX, ES:[BX]");
        assert_eq!(disassemble(&[0x8E, 0xD8]), "MOV DS, AX");
        assert_eq!(
            disassemble(&[0xC7, 0x06, 0x00, 0x10, 0x34, 0x12]),
            "MOV WORD PTR [0x1000], 0x1234"
        );
    }

    #[test]
    fn test_control_transfer() {
        assert_eq!(disassemble(&[0xEB, 0xFE]), "JMP $+0x0");
        assert_eq!(disassemble(&[0x75, 0xFA]), "JNE $-0x4");
        assert_eq!(disassemble(&[0xEA, 0x00, 0x7C, 0x00, 0x00]), "JMP FAR 0x0000:0x7C00");
        assert_eq!(disassemble(&[0xCD, 0x21]), "INT 0x21");
        assert_eq!(disassemble(&[0xCC]), "INT3");
    }

    #[test]
    fn test_strings_and_misc() {
        assert_eq!(disassemble(&[0xF3, 0xA4]), "REP MOVSB");
        assert_eq!(disassemble(&[0xF3, 0xA6]), "REPE CMPSB");
        assert_eq!(disassemble(&[0x90]), "NOP");
        assert_eq!(disassemble(&[0xD4, 0x0A]), "AAM");
        assert_eq!(disassemble(&[0x0F]), "(bad) 0x0F");
    }
}
