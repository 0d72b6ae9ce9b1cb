//! Extension ("group") opcodes.
//!
//! For these opcodes the opcode byte alone does not identify the
//! operation; the `reg` field of the following ModRM byte selects
//! one of up to eight operations.  Slots which the 8086 leaves
//! unassigned decode to [`Operation::Unknown`], after consuming the
//! whole encoding so that the instruction length is still right.
use crate::bitfield::sign_extend_byte;
use crate::instruction::DecodeFailure;
use crate::source::Cursor;
use crate::width::Width;

use super::modrm::{read_immediate, read_rm_operand, ModRm};
use super::operand::Operand;
use super::operation::{ArithOp, IncDecOp, MulDivOp, Operation, ShiftCount, ShiftOp, UnaryOp};

/// Decodes the remainder of a group instruction.  Returns `None` if
/// `opcode` is not a group opcode (in which case nothing has been
/// consumed).
pub(crate) fn decode_extension(
    opcode: u8,
    cursor: &mut Cursor,
) -> Result<Option<Operation>, DecodeFailure> {
    let operation = match opcode {
        0x80..=0x83 => immediate_group(opcode, cursor)?,
        0xD0..=0xD3 => shift_group(opcode, cursor)?,
        0xF6 | 0xF7 => unary_group(opcode, cursor)?,
        0xFE => inc_dec_group(cursor)?,
        0xFF => word_group(cursor)?,
        _ => return Ok(None),
    };
    Ok(Some(operation))
}

/// 0x80-0x83: ALU operation with an immediate operand.  0x82 is an
/// alias of 0x80; 0x83 sign-extends an 8-bit immediate to 16 bits.
fn immediate_group(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let modrm = ModRm::read(cursor)?;
    let dst = read_rm_operand(cursor, modrm, width)?;
    let imm = if opcode == 0x83 {
        sign_extend_byte(cursor.next_byte()?)
    } else {
        read_immediate(cursor, width)?
    };
    Ok(Operation::Arith {
        op: ArithOp::from_index(modrm.reg),
        width,
        dst,
        src: Operand::Immediate(imm),
    })
}

fn shift_group(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let modrm = ModRm::read(cursor)?;
    let target = read_rm_operand(cursor, modrm, width)?;
    let op = match modrm.reg {
        0 => ShiftOp::Rol,
        1 => ShiftOp::Ror,
        2 => ShiftOp::Rcl,
        3 => ShiftOp::Rcr,
        4 => ShiftOp::Shl,
        5 => ShiftOp::Shr,
        6 => return Ok(Operation::Unknown),
        _ => ShiftOp::Sar,
    };
    let count = if opcode & 0b10 == 0 {
        ShiftCount::One
    } else {
        ShiftCount::Cl
    };
    Ok(Operation::Shift {
        op,
        width,
        target,
        count,
    })
}

fn unary_group(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let modrm = ModRm::read(cursor)?;
    let target = read_rm_operand(cursor, modrm, width)?;
    Ok(match modrm.reg {
        // reg=1 is an undocumented alias of TEST on the 8086.
        0 | 1 => Operation::Test {
            width,
            dst: target,
            src: Operand::Immediate(read_immediate(cursor, width)?),
        },
        2 => Operation::Unary {
            op: UnaryOp::Not,
            width,
            target,
        },
        3 => Operation::Unary {
            op: UnaryOp::Neg,
            width,
            target,
        },
        reg => Operation::MulDiv {
            op: match reg {
                4 => MulDivOp::Mul,
                5 => MulDivOp::Imul,
                6 => MulDivOp::Div,
                _ => MulDivOp::Idiv,
            },
            width,
            source: target,
        },
    })
}

fn inc_dec_group(cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let modrm = ModRm::read(cursor)?;
    let target = read_rm_operand(cursor, modrm, Width::Byte)?;
    Ok(match modrm.reg {
        0 => Operation::IncDec {
            op: IncDecOp::Inc,
            width: Width::Byte,
            target,
        },
        1 => Operation::IncDec {
            op: IncDecOp::Dec,
            width: Width::Byte,
            target,
        },
        _ => Operation::Unknown,
    })
}

/// 0xFF: INC, DEC, CALL, CALL FAR, JMP, JMP FAR, PUSH.  The far forms
/// need a memory operand (holding the offset and segment).
fn word_group(cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let modrm = ModRm::read(cursor)?;
    let target = read_rm_operand(cursor, modrm, Width::Word)?;
    Ok(match (modrm.reg, target) {
        (0, _) => Operation::IncDec {
            op: IncDecOp::Inc,
            width: Width::Word,
            target,
        },
        (1, _) => Operation::IncDec {
            op: IncDecOp::Dec,
            width: Width::Word,
            target,
        },
        (2, _) => Operation::CallIndirect { target },
        (3, Operand::Memory(address)) => Operation::CallFarIndirect { address },
        (4, _) => Operation::JumpIndirect { target },
        (5, Operand::Memory(address)) => Operation::JumpFarIndirect { address },
        (6, _) => Operation::Push(target),
        _ => Operation::Unknown,
    })
}
