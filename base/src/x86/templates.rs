//! The instruction template table.
//!
//! Each template recognises one family of opcodes.  Its `matches`
//! predicate looks only at the opcode byte and has no side effects;
//! its `parse` function reads the rest of the encoding (ModRM byte,
//! displacement, immediate) from the cursor, which is positioned
//! just after the opcode.  Templates are tried in table order and the
//! first match wins; no two templates match the same opcode.  The
//! group opcodes (0x80-0x83, 0xD0-0xD3, 0xF6, 0xF7, 0xFE, 0xFF) are
//! not in the table at all, see [`super::group`].
use crate::instruction::DecodeFailure;
use crate::source::Cursor;
use crate::width::Width;

use super::modrm::{read_effective_address, read_immediate, read_rm_operand, reg_operand, ModRm};
use super::operand::{EffectiveAddress, Operand, Port};
use super::operation::{
    AdjustOp, ArithOp, Condition, FlagOp, IncDecOp, LoopOp, Operation, StringOp,
};
use super::registers::{Register, SegmentRegister, WordRegister};

pub(crate) type ParseFn = fn(u8, &mut Cursor) -> Result<Operation, DecodeFailure>;

pub(crate) struct Template {
    pub(crate) name: &'static str,
    pub(crate) matches: fn(u8) -> bool,
    pub(crate) parse: ParseFn,
}

pub(crate) static TEMPLATES: &[Template] = &[
    Template {
        name: "arith r/m,reg",
        matches: is_arith_rm,
        parse: parse_arith_rm,
    },
    Template {
        name: "arith acc,imm",
        matches: is_arith_acc_imm,
        parse: parse_arith_acc_imm,
    },
    Template {
        name: "push sreg",
        matches: is_push_segment,
        parse: parse_push_segment,
    },
    Template {
        name: "pop sreg",
        matches: is_pop_segment,
        parse: parse_pop_segment,
    },
    Template {
        name: "decimal adjust",
        matches: is_decimal_adjust,
        parse: parse_decimal_adjust,
    },
    Template {
        name: "inc/dec reg16",
        matches: is_inc_dec_register,
        parse: parse_inc_dec_register,
    },
    Template {
        name: "push/pop reg16",
        matches: is_push_pop_register,
        parse: parse_push_pop_register,
    },
    Template {
        name: "jcc",
        matches: is_conditional_jump,
        parse: parse_conditional_jump,
    },
    Template {
        name: "test/xchg r/m,reg",
        matches: is_test_xchg_rm,
        parse: parse_test_xchg_rm,
    },
    Template {
        name: "mov r/m,reg",
        matches: is_mov_rm,
        parse: parse_mov_rm,
    },
    Template {
        name: "mov sreg",
        matches: is_mov_segment,
        parse: parse_mov_segment,
    },
    Template {
        name: "lea",
        matches: is_lea,
        parse: parse_lea,
    },
    Template {
        name: "pop r/m16",
        matches: is_pop_rm,
        parse: parse_pop_rm,
    },
    Template {
        name: "xchg ax,reg16",
        matches: is_xchg_accumulator,
        parse: parse_xchg_accumulator,
    },
    Template {
        name: "cbw/cwd",
        matches: is_convert,
        parse: parse_convert,
    },
    Template {
        name: "call far",
        matches: is_call_far,
        parse: parse_call_far,
    },
    Template {
        name: "wait",
        matches: is_wait,
        parse: parse_wait,
    },
    Template {
        name: "flags transfer",
        matches: is_flags_transfer,
        parse: parse_flags_transfer,
    },
    Template {
        name: "mov acc,moffs",
        matches: is_mov_accumulator_memory,
        parse: parse_mov_accumulator_memory,
    },
    Template {
        name: "string",
        matches: is_string,
        parse: parse_string,
    },
    Template {
        name: "test acc,imm",
        matches: is_test_accumulator,
        parse: parse_test_accumulator,
    },
    Template {
        name: "mov reg,imm",
        matches: is_mov_register_immediate,
        parse: parse_mov_register_immediate,
    },
    Template {
        name: "ret",
        matches: is_return,
        parse: parse_return,
    },
    Template {
        name: "les/lds",
        matches: is_load_far_pointer,
        parse: parse_load_far_pointer,
    },
    Template {
        name: "mov r/m,imm",
        matches: is_mov_rm_immediate,
        parse: parse_mov_rm_immediate,
    },
    Template {
        name: "int/into/iret",
        matches: is_interrupt,
        parse: parse_interrupt,
    },
    Template {
        name: "aam/aad",
        matches: is_ascii_adjust,
        parse: parse_ascii_adjust,
    },
    Template {
        name: "xlat",
        matches: is_translate,
        parse: parse_translate,
    },
    Template {
        name: "esc",
        matches: is_escape,
        parse: parse_escape,
    },
    Template {
        name: "loop/jcxz",
        matches: is_loop,
        parse: parse_loop,
    },
    Template {
        name: "in/out",
        matches: is_in_out,
        parse: parse_in_out,
    },
    Template {
        name: "call/jmp",
        matches: is_call_jump,
        parse: parse_call_jump,
    },
    Template {
        name: "hlt",
        matches: is_halt,
        parse: parse_halt,
    },
    Template {
        name: "flag operation",
        matches: is_flag_operation,
        parse: parse_flag_operation,
    },
];

/// Returns the template which recognises `opcode`, if any.
pub(crate) fn find_template(opcode: u8) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| (t.matches)(opcode))
}

// 00xxx0dw
fn is_arith_rm(op: u8) -> bool {
    op & 0b1100_0100 == 0
}

fn parse_arith_rm(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let op = ArithOp::from_index(opcode >> 3);
    let width = Width::from_w_bit(opcode);
    let modrm = ModRm::read(cursor)?;
    let rm = read_rm_operand(cursor, modrm, width)?;
    let reg = reg_operand(modrm, width);
    let (dst, src) = if opcode & 0b10 == 0 {
        (rm, reg)
    } else {
        (reg, rm)
    };
    Ok(Operation::Arith { op, width, dst, src })
}

// 00xxx10w
fn is_arith_acc_imm(op: u8) -> bool {
    op & 0b1100_0110 == 0b0000_0100
}

fn parse_arith_acc_imm(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    Ok(Operation::Arith {
        op: ArithOp::from_index(opcode >> 3),
        width,
        dst: Operand::Register(Register::accumulator(width)),
        src: Operand::Immediate(read_immediate(cursor, width)?),
    })
}

// 000ss110
fn is_push_segment(op: u8) -> bool {
    op & 0b1110_0111 == 0b0000_0110
}

fn parse_push_segment(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Push(Operand::Segment(SegmentRegister::from_index(
        opcode >> 3,
    ))))
}

// 000ss111, except that POP CS (0x0F) is not supported.
fn is_pop_segment(op: u8) -> bool {
    op & 0b1110_0111 == 0b0000_0111 && op != 0x0F
}

fn parse_pop_segment(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Pop(Operand::Segment(SegmentRegister::from_index(
        opcode >> 3,
    ))))
}

// 001xx111
fn is_decimal_adjust(op: u8) -> bool {
    op & 0b1110_0111 == 0b0010_0111
}

fn parse_decimal_adjust(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Adjust(match (opcode >> 3) & 3 {
        0 => AdjustOp::Daa,
        1 => AdjustOp::Das,
        2 => AdjustOp::Aaa,
        _ => AdjustOp::Aas,
    }))
}

fn is_inc_dec_register(op: u8) -> bool {
    op & 0xF0 == 0x40
}

fn parse_inc_dec_register(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::IncDec {
        op: if opcode & 0x08 == 0 {
            IncDecOp::Inc
        } else {
            IncDecOp::Dec
        },
        width: Width::Word,
        target: Operand::Register(Register::Word(WordRegister::from_index(opcode))),
    })
}

fn is_push_pop_register(op: u8) -> bool {
    op & 0xF0 == 0x50
}

fn parse_push_pop_register(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let operand = Operand::Register(Register::Word(WordRegister::from_index(opcode)));
    Ok(if opcode & 0x08 == 0 {
        Operation::Push(operand)
    } else {
        Operation::Pop(operand)
    })
}

fn is_conditional_jump(op: u8) -> bool {
    op & 0xF0 == 0x70
}

fn parse_conditional_jump(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::JumpConditional {
        condition: Condition::from_index(opcode),
        displacement: cursor.next_byte()? as i8,
    })
}

fn is_test_xchg_rm(op: u8) -> bool {
    op & 0xFC == 0x84
}

fn parse_test_xchg_rm(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let modrm = ModRm::read(cursor)?;
    let rm = read_rm_operand(cursor, modrm, width)?;
    let reg = reg_operand(modrm, width);
    Ok(if opcode & 0b10 == 0 {
        Operation::Test {
            width,
            dst: rm,
            src: reg,
        }
    } else {
        Operation::Xchg { width, a: reg, b: rm }
    })
}

fn is_mov_rm(op: u8) -> bool {
    op & 0xFC == 0x88
}

fn parse_mov_rm(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let modrm = ModRm::read(cursor)?;
    let rm = read_rm_operand(cursor, modrm, width)?;
    let reg = reg_operand(modrm, width);
    let (dst, src) = if opcode & 0b10 == 0 {
        (rm, reg)
    } else {
        (reg, rm)
    };
    Ok(Operation::Mov { width, dst, src })
}

// 0x8C and 0x8E
fn is_mov_segment(op: u8) -> bool {
    op & 0xFD == 0x8C
}

fn parse_mov_segment(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let modrm = ModRm::read(cursor)?;
    let rm = read_rm_operand(cursor, modrm, Width::Word)?;
    if modrm.reg > 3 {
        return Ok(Operation::Unknown);
    }
    let seg = Operand::Segment(SegmentRegister::from_index(modrm.reg));
    let (dst, src) = if opcode & 0b10 == 0 {
        (rm, seg)
    } else {
        (seg, rm)
    };
    Ok(Operation::Mov {
        width: Width::Word,
        dst,
        src,
    })
}

fn is_lea(op: u8) -> bool {
    op == 0x8D
}

fn parse_lea(_: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let modrm = ModRm::read(cursor)?;
    if modrm.is_register() {
        return Ok(Operation::Unknown);
    }
    Ok(Operation::Lea {
        dst: WordRegister::from_index(modrm.reg),
        address: read_effective_address(cursor, modrm)?,
    })
}

fn is_pop_rm(op: u8) -> bool {
    op == 0x8F
}

fn parse_pop_rm(_: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let modrm = ModRm::read(cursor)?;
    let target = read_rm_operand(cursor, modrm, Width::Word)?;
    if modrm.reg != 0 {
        return Ok(Operation::Unknown);
    }
    Ok(Operation::Pop(target))
}

// 0x90 (NOP) is XCHG AX,AX.
fn is_xchg_accumulator(op: u8) -> bool {
    op & 0xF8 == 0x90
}

fn parse_xchg_accumulator(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Xchg {
        width: Width::Word,
        a: Operand::Register(Register::Word(WordRegister::AX)),
        b: Operand::Register(Register::Word(WordRegister::from_index(opcode))),
    })
}

fn is_convert(op: u8) -> bool {
    op == 0x98 || op == 0x99
}

fn parse_convert(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(if opcode == 0x98 {
        Operation::ConvertByteToWord
    } else {
        Operation::ConvertWordToDouble
    })
}

fn is_call_far(op: u8) -> bool {
    op == 0x9A
}

fn parse_call_far(_: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let offset = cursor.next_word()?;
    let segment = cursor.next_word()?;
    Ok(Operation::CallFar { segment, offset })
}

fn is_wait(op: u8) -> bool {
    op == 0x9B
}

fn parse_wait(_: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Wait)
}

fn is_flags_transfer(op: u8) -> bool {
    op & 0xFC == 0x9C
}

fn parse_flags_transfer(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(match opcode {
        0x9C => Operation::PushFlags,
        0x9D => Operation::PopFlags,
        0x9E => Operation::StoreAhIntoFlags,
        _ => Operation::LoadAhFromFlags,
    })
}

fn is_mov_accumulator_memory(op: u8) -> bool {
    op & 0xFC == 0xA0
}

fn parse_mov_accumulator_memory(
    opcode: u8,
    cursor: &mut Cursor,
) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let memory = Operand::Memory(EffectiveAddress::direct(cursor.next_word()?));
    let acc = Operand::Register(Register::accumulator(width));
    let (dst, src) = if opcode & 0b10 == 0 {
        (acc, memory)
    } else {
        (memory, acc)
    };
    Ok(Operation::Mov { width, dst, src })
}

// A4-A7 and AA-AF.
fn is_string(op: u8) -> bool {
    op & 0xFC == 0xA4 || (0xAA..=0xAF).contains(&op)
}

fn parse_string(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let op = match opcode & 0xFE {
        0xA4 => StringOp::Movs,
        0xA6 => StringOp::Cmps,
        0xAA => StringOp::Stos,
        0xAC => StringOp::Lods,
        _ => StringOp::Scas,
    };
    Ok(Operation::String {
        op,
        width: Width::from_w_bit(opcode),
    })
}

fn is_test_accumulator(op: u8) -> bool {
    op == 0xA8 || op == 0xA9
}

fn parse_test_accumulator(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    Ok(Operation::Test {
        width,
        dst: Operand::Register(Register::accumulator(width)),
        src: Operand::Immediate(read_immediate(cursor, width)?),
    })
}

// 1011wrrr
fn is_mov_register_immediate(op: u8) -> bool {
    op & 0xF0 == 0xB0
}

fn parse_mov_register_immediate(
    opcode: u8,
    cursor: &mut Cursor,
) -> Result<Operation, DecodeFailure> {
    let width = if opcode & 0x08 == 0 {
        Width::Byte
    } else {
        Width::Word
    };
    Ok(Operation::Mov {
        width,
        dst: Operand::Register(Register::from_index(width, opcode)),
        src: Operand::Immediate(read_immediate(cursor, width)?),
    })
}

// C2, C3 (near) and CA, CB (far).
fn is_return(op: u8) -> bool {
    op & 0xF6 == 0xC2
}

fn parse_return(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let pop = if opcode & 1 == 0 {
        cursor.next_word()?
    } else {
        0
    };
    Ok(if opcode & 0x08 == 0 {
        Operation::Return { pop }
    } else {
        Operation::ReturnFar { pop }
    })
}

fn is_load_far_pointer(op: u8) -> bool {
    op == 0xC4 || op == 0xC5
}

fn parse_load_far_pointer(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let modrm = ModRm::read(cursor)?;
    if modrm.is_register() {
        return Ok(Operation::Unknown);
    }
    Ok(Operation::LoadFarPointer {
        segment: if opcode == 0xC4 {
            SegmentRegister::ES
        } else {
            SegmentRegister::DS
        },
        dst: WordRegister::from_index(modrm.reg),
        address: read_effective_address(cursor, modrm)?,
    })
}

fn is_mov_rm_immediate(op: u8) -> bool {
    op == 0xC6 || op == 0xC7
}

fn parse_mov_rm_immediate(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let modrm = ModRm::read(cursor)?;
    let dst = read_rm_operand(cursor, modrm, width)?;
    let imm = read_immediate(cursor, width)?;
    if modrm.reg != 0 {
        return Ok(Operation::Unknown);
    }
    Ok(Operation::Mov {
        width,
        dst,
        src: Operand::Immediate(imm),
    })
}

fn is_interrupt(op: u8) -> bool {
    op & 0xFC == 0xCC
}

fn parse_interrupt(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(match opcode {
        0xCC => Operation::Interrupt { vector: 3 },
        0xCD => Operation::Interrupt {
            vector: cursor.next_byte()?,
        },
        0xCE => Operation::InterruptOnOverflow,
        _ => Operation::InterruptReturn,
    })
}

fn is_ascii_adjust(op: u8) -> bool {
    op == 0xD4 || op == 0xD5
}

fn parse_ascii_adjust(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let base = cursor.next_byte()?;
    Ok(if opcode == 0xD4 {
        Operation::AsciiAdjustMultiply { base }
    } else {
        Operation::AsciiAdjustDivide { base }
    })
}

fn is_translate(op: u8) -> bool {
    op == 0xD7
}

fn parse_translate(_: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Translate)
}

fn is_escape(op: u8) -> bool {
    op & 0xF8 == 0xD8
}

fn parse_escape(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let modrm = ModRm::read(cursor)?;
    let operand = read_rm_operand(cursor, modrm, Width::Word)?;
    Ok(Operation::Escape {
        opcode: ((opcode & 7) << 3) | modrm.reg,
        operand,
    })
}

fn is_loop(op: u8) -> bool {
    op & 0xFC == 0xE0
}

fn parse_loop(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let op = match opcode {
        0xE0 => LoopOp::Loopne,
        0xE1 => LoopOp::Loope,
        0xE2 => LoopOp::Loop,
        _ => LoopOp::Jcxz,
    };
    Ok(Operation::Loop {
        op,
        displacement: cursor.next_byte()? as i8,
    })
}

// E4-E7 take an immediate port number, EC-EF use DX.
fn is_in_out(op: u8) -> bool {
    op & 0xF4 == 0xE4
}

fn parse_in_out(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    let width = Width::from_w_bit(opcode);
    let port = if opcode & 0x08 == 0 {
        Port::Immediate(cursor.next_byte()?)
    } else {
        Port::Dx
    };
    Ok(if opcode & 0b10 == 0 {
        Operation::In { width, port }
    } else {
        Operation::Out { width, port }
    })
}

fn is_call_jump(op: u8) -> bool {
    op & 0xFC == 0xE8
}

fn parse_call_jump(opcode: u8, cursor: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(match opcode {
        0xE8 => Operation::CallRelative {
            displacement: cursor.next_word()? as i16,
        },
        0xE9 => Operation::JumpRelative {
            displacement: cursor.next_word()? as i16,
        },
        0xEA => {
            let offset = cursor.next_word()?;
            let segment = cursor.next_word()?;
            Operation::JumpFar { segment, offset }
        }
        _ => Operation::JumpRelative {
            displacement: i16::from(cursor.next_byte()? as i8),
        },
    })
}

fn is_halt(op: u8) -> bool {
    op == 0xF4
}

fn parse_halt(_: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Halt)
}

// F5 and F8-FD.
fn is_flag_operation(op: u8) -> bool {
    op == 0xF5 || (0xF8..=0xFD).contains(&op)
}

fn parse_flag_operation(opcode: u8, _: &mut Cursor) -> Result<Operation, DecodeFailure> {
    Ok(Operation::Flag(match opcode {
        0xF5 => FlagOp::Cmc,
        0xF8 => FlagOp::Clc,
        0xF9 => FlagOp::Stc,
        0xFA => FlagOp::Cli,
        0xFB => FlagOp::Sti,
        0xFC => FlagOp::Cld,
        _ => FlagOp::Std,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_do_not_overlap() {
        for opcode in 0..=255_u8 {
            let claimants: Vec<&str> = TEMPLATES
                .iter()
                .filter(|t| (t.matches)(opcode))
                .map(|t| t.name)
                .collect();
            assert!(
                claimants.len() <= 1,
                "opcode {opcode:#04x} is claimed by {claimants:?}"
            );
        }
    }

    #[test]
    fn test_prefixes_and_groups_are_not_templates() {
        for opcode in [
            0x26_u8, 0x2E, 0x36, 0x3E, 0xF0, 0xF2, 0xF3, 0x80, 0x81, 0x82, 0x83, 0xD0, 0xD1, 0xD2,
            0xD3, 0xF6, 0xF7, 0xFE, 0xFF,
        ] {
            assert!(
                find_template(opcode).is_none(),
                "opcode {opcode:#04x} should not have a template"
            );
        }
    }

    #[test]
    fn test_unassigned_opcodes_have_no_template() {
        for opcode in [0x0F_u8, 0x60, 0x6F, 0xC0, 0xC1, 0xC8, 0xC9, 0xD6, 0xF1] {
            assert!(find_template(opcode).is_none(), "{opcode:#04x}");
        }
    }
}
