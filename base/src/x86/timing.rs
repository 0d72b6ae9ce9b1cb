//! Instruction timing estimates.
//!
//! Figures are the base clock counts from the 8086 data sheet.  Where
//! the real figure depends on run-time data (taken or untaken
//! branches, shift counts, repeat counts, multiplier values, odd
//! addresses) we use a single representative value; we do not aim for
//! cycle accuracy.
use super::operand::{AddressBase, EffectiveAddress, Operand, Port};
use super::operation::{
    AdjustOp, ArithOp, LoopOp, MulDivOp, Operation, ShiftCount, StringOp,
};
use super::prefix::Prefixes;
use super::registers::Register;
use crate::width::Width;

/// Clocks taken to compute an effective address.
#[must_use]
pub fn effective_address_clocks(ea: &EffectiveAddress) -> u32 {
    let with_disp = ea.displacement_bytes > 0;
    match ea.base {
        AddressBase::Direct => 6,
        AddressBase::Si | AddressBase::Di | AddressBase::Bp | AddressBase::Bx => {
            if with_disp {
                9
            } else {
                5
            }
        }
        AddressBase::BpDi | AddressBase::BxSi => {
            if with_disp {
                11
            } else {
                7
            }
        }
        AddressBase::BpSi | AddressBase::BxDi => {
            if with_disp {
                12
            } else {
                8
            }
        }
    }
}

fn ea(operand: &Operand) -> u32 {
    match operand {
        Operand::Memory(address) => effective_address_clocks(address),
        _ => 0,
    }
}

fn is_accumulator(operand: &Operand) -> bool {
    matches!(
        operand,
        Operand::Register(r) if *r == Register::accumulator(r.width())
    )
}

fn arith_clocks(op: ArithOp, dst: &Operand, src: &Operand) -> u32 {
    let cmp = !op.writes_result();
    match (dst, src) {
        (Operand::Memory(_), Operand::Immediate(_)) => (if cmp { 10 } else { 17 }) + ea(dst),
        (Operand::Memory(_), _) => (if cmp { 9 } else { 16 }) + ea(dst),
        (_, Operand::Memory(_)) => 9 + ea(src),
        (_, Operand::Immediate(_)) => 4,
        _ => 3,
    }
}

fn mov_clocks(dst: &Operand, src: &Operand) -> u32 {
    match (dst, src) {
        (Operand::Memory(EffectiveAddress { base: AddressBase::Direct, .. }), _)
        | (_, Operand::Memory(EffectiveAddress { base: AddressBase::Direct, .. }))
            if is_accumulator(dst) || is_accumulator(src) =>
        {
            10
        }
        (Operand::Memory(_), Operand::Immediate(_)) => 10 + ea(dst),
        (Operand::Memory(_), _) => 9 + ea(dst),
        (_, Operand::Memory(_)) => 8 + ea(src),
        (_, Operand::Immediate(_)) => 4,
        _ => 2,
    }
}

fn muldiv_clocks(op: MulDivOp, width: Width) -> u32 {
    match (op, width) {
        (MulDivOp::Mul, Width::Byte) => 77,
        (MulDivOp::Mul, Width::Word) => 133,
        (MulDivOp::Imul, Width::Byte) => 98,
        (MulDivOp::Imul, Width::Word) => 154,
        (MulDivOp::Div, Width::Byte) => 90,
        (MulDivOp::Div, Width::Word) => 162,
        (MulDivOp::Idiv, Width::Byte) => 112,
        (MulDivOp::Idiv, Width::Word) => 184,
    }
}

fn string_clocks(op: StringOp) -> u32 {
    match op {
        StringOp::Movs => 18,
        StringOp::Cmps => 22,
        StringOp::Stos => 11,
        StringOp::Lods => 12,
        StringOp::Scas => 15,
    }
}

/// Estimates the clock count of an instruction.
#[must_use]
pub fn estimate_clocks(operation: &Operation, prefixes: &Prefixes) -> u32 {
    let base = match operation {
        Operation::Arith { op, dst, src, .. } => arith_clocks(*op, dst, src),
        Operation::Test { dst, src, .. } => match (dst, src) {
            (Operand::Memory(_), Operand::Immediate(_)) => 11 + ea(dst),
            (Operand::Memory(_), _) => 9 + ea(dst),
            (_, Operand::Immediate(_)) if is_accumulator(dst) => 4,
            (_, Operand::Immediate(_)) => 5,
            _ => 3,
        },
        Operation::IncDec { width, target, .. } => match (target, width) {
            (Operand::Memory(_), _) => 15 + ea(target),
            (_, Width::Word) => 2,
            (_, Width::Byte) => 3,
        },
        Operation::Unary { target, .. } => match target {
            Operand::Memory(_) => 16 + ea(target),
            _ => 3,
        },
        Operation::MulDiv { op, width, source } => muldiv_clocks(*op, *width) + ea(source),
        Operation::Shift { target, count, .. } => match (target, count) {
            (Operand::Memory(_), ShiftCount::One) => 15 + ea(target),
            (Operand::Memory(_), ShiftCount::Cl) => 20 + ea(target),
            (_, ShiftCount::One) => 2,
            (_, ShiftCount::Cl) => 8,
        },
        Operation::Mov { dst, src, .. } => mov_clocks(dst, src),
        Operation::Xchg { a, b, .. } => match (a, b) {
            (_, Operand::Memory(_)) => 17 + ea(b),
            _ if is_accumulator(a) => 3,
            _ => 4,
        },
        Operation::Lea { address, .. } => 2 + effective_address_clocks(address),
        Operation::LoadFarPointer { address, .. } => 16 + effective_address_clocks(address),
        Operation::Push(operand) => match operand {
            Operand::Memory(_) => 16 + ea(operand),
            Operand::Segment(_) => 10,
            _ => 11,
        },
        Operation::Pop(operand) => match operand {
            Operand::Memory(_) => 17 + ea(operand),
            _ => 8,
        },
        Operation::PushFlags => 10,
        Operation::PopFlags => 8,
        Operation::StoreAhIntoFlags | Operation::LoadAhFromFlags => 4,
        Operation::ConvertByteToWord => 2,
        Operation::ConvertWordToDouble => 5,
        Operation::Translate => 11,
        Operation::Adjust(AdjustOp::Daa | AdjustOp::Das) => 4,
        Operation::Adjust(AdjustOp::Aaa | AdjustOp::Aas) => 8,
        Operation::AsciiAdjustMultiply { .. } => 83,
        Operation::AsciiAdjustDivide { .. } => 60,
        Operation::JumpConditional { .. } => 16,
        Operation::JumpRelative { .. } | Operation::JumpFar { .. } => 15,
        Operation::JumpIndirect { target } => match target {
            Operand::Memory(_) => 18 + ea(target),
            _ => 11,
        },
        Operation::JumpFarIndirect { address } => 24 + effective_address_clocks(address),
        Operation::CallRelative { .. } => 19,
        Operation::CallFar { .. } => 28,
        Operation::CallIndirect { target } => match target {
            Operand::Memory(_) => 21 + ea(target),
            _ => 16,
        },
        Operation::CallFarIndirect { address } => 37 + effective_address_clocks(address),
        Operation::Return { pop } => {
            if *pop == 0 {
                8
            } else {
                12
            }
        }
        Operation::ReturnFar { pop } => {
            if *pop == 0 {
                18
            } else {
                17
            }
        }
        Operation::Loop { op, .. } => match op {
            LoopOp::Loop => 17,
            LoopOp::Loope | LoopOp::Jcxz => 18,
            LoopOp::Loopne => 19,
        },
        Operation::Interrupt { vector: 3 } => 52,
        Operation::Interrupt { .. } => 51,
        Operation::InterruptOnOverflow => 53,
        Operation::InterruptReturn => 24,
        Operation::String { op, .. } => {
            string_clocks(*op) + if prefixes.repeat.is_some() { 9 } else { 0 }
        }
        Operation::In { port, .. } | Operation::Out { port, .. } => match port {
            Port::Immediate(_) => 10,
            Port::Dx => 8,
        },
        Operation::Flag(_) | Operation::Halt => 2,
        Operation::Wait => 3,
        Operation::Escape { operand, .. } => match operand {
            Operand::Memory(_) => 8 + ea(operand),
            _ => 2,
        },
        Operation::Unknown => 2,
    };
    base + 2 * u32::from(prefixes.segment.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Inst;
    use crate::x86::decode_slice;

    fn clocks(bytes: &[u8]) -> u32 {
        decode_slice(bytes)
            .expect("test data should decode")
            .clocks()
    }

    #[test]
    fn test_register_forms() {
        // ADD AX,BX
        assert_eq!(clocks(&[0x01, 0xD8]), 3);
        // MOV AX,BX
        assert_eq!(clocks(&[0x89, 0xD8]), 2);
        // MOV AX,1234
        assert_eq!(clocks(&[0xB8, 0x34, 0x12]), 4);
    }

    #[test]
    fn test_memory_forms_include_effective_address() {
        // ADD [BX+SI],AL: 16 + 7
        assert_eq!(clocks(&[0x00, 0x00]), 23);
        // ADD [BP+DI+5],AL: 16 + 11
        assert_eq!(clocks(&[0x00, 0x43, 0x05]), 27);
        // MOV AL,[1234]: accumulator form
        assert_eq!(clocks(&[0xA0, 0x34, 0x12]), 10);
    }

    #[test]
    fn test_segment_override_costs_two() {
        assert_eq!(clocks(&[0x26, 0x00, 0x00]), 25);
    }
}
