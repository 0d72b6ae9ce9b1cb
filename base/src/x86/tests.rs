use test_strategy::proptest;

use super::*;
use crate::instruction::{DecodeFailure, Inst};
use crate::width::Width;

fn decode_ok(bytes: &[u8]) -> Instruction {
    match decode_slice(bytes) {
        Ok(inst) => inst,
        Err(e) => panic!("failed to decode {bytes:02X?}: {e}"),
    }
}

#[test]
fn test_prefix_chain_then_add_al_imm8() {
    let inst = decode_ok(&[0x2E, 0x26, 0x04, 0x05]);
    assert_eq!(inst.length(), 4);
    assert_eq!(inst.opcode(), 0x04);
    assert_eq!(inst.prefixes().count, 2);
    assert_eq!(
        inst.operation(),
        &Operation::Arith {
            op: ArithOp::Add,
            width: Width::Byte,
            dst: Operand::Register(Register::Byte(ByteRegister::AL)),
            src: Operand::Immediate(5),
        }
    );
}

#[test]
fn test_mov_ax_imm16() {
    let inst = decode_ok(&[0xB8, 0x34, 0x12]);
    assert_eq!(inst.length(), 3);
    assert_eq!(
        inst.operation(),
        &Operation::Mov {
            width: Width::Word,
            dst: Operand::Register(Register::Word(WordRegister::AX)),
            src: Operand::Immediate(0x1234),
        }
    );
    assert!(!inst.writes_program_counter());
}

#[test]
fn test_group_one_dispatches_to_add() {
    let inst = decode_ok(&[0x80, 0b11_000_000, 0x07]);
    assert_eq!(inst.length(), 3);
    match inst.operation() {
        Operation::Arith {
            op: ArithOp::Add,
            width: Width::Byte,
            dst: Operand::Register(Register::Byte(ByteRegister::AL)),
            src: Operand::Immediate(7),
        } => (),
        other => panic!("expected ADD AL,7, got {other:?}"),
    }
}

#[test]
fn test_unknown_opcode_is_not_an_error() {
    let inst = decode_ok(&[0x0F, 0x00]);
    assert!(inst.is_unknown());
    assert_eq!(inst.length(), 1);
}

#[test]
fn test_truncated_instruction_reports_end_of_stream() {
    assert_eq!(
        decode_slice(&[0xB8, 0x34]),
        Err(DecodeFailure::EndOfStream { position: 2 })
    );
    assert_eq!(
        decode_slice(&[0x26]),
        Err(DecodeFailure::EndOfStream { position: 1 })
    );
    assert_eq!(
        decode_slice(&[]),
        Err(DecodeFailure::EndOfStream { position: 0 })
    );
}

#[test]
fn test_decode_from_nonzero_start() {
    let mut program: &[u8] = &[0x90, 0xB0, 0x01, 0xF4];
    let first = decode(&mut program, 0).expect("NOP should decode");
    assert_eq!(first.length(), 1);
    let second = decode(&mut program, first.length()).expect("MOV should decode");
    assert_eq!(second.length(), 2);
    assert_eq!(
        second.operation(),
        &Operation::Mov {
            width: Width::Byte,
            dst: Operand::Register(Register::Byte(ByteRegister::AL)),
            src: Operand::Immediate(1),
        }
    );
    let third = decode(&mut program, 3).expect("HLT should decode");
    assert_eq!(third.operation(), &Operation::Halt);
}

#[test]
fn test_segment_for_memory_operands() {
    let inst = decode_ok(&[0x8B, 0x46, 0x02]); // MOV AX,[BP+2]
    let Operation::Mov {
        src: Operand::Memory(address),
        ..
    } = *inst.operation()
    else {
        panic!("expected a memory source operand");
    };
    assert_eq!(inst.segment_for(&address), SegmentRegister::SS);

    let overridden = decode_ok(&[0x26, 0x8B, 0x46, 0x02]);
    assert_eq!(overridden.segment_for(&address), SegmentRegister::ES);
}

#[test]
fn test_control_transfer_classification() {
    // JMP short: static target.
    let jmp = decode_ok(&[0xEB, 0x10]);
    assert!(jmp.writes_program_counter());
    assert!(jmp.has_static_target());
    // JMP [BX]: dynamic target.
    let indirect = decode_ok(&[0xFF, 0x27]);
    assert!(indirect.writes_program_counter());
    assert!(!indirect.has_static_target());
    // RET
    let ret = decode_ok(&[0xC3]);
    assert!(ret.writes_program_counter());
    assert!(!ret.has_static_target());
}

#[test]
fn test_immediate_follows_displacement() {
    // ADD WORD PTR [BX+SI+0x1234], 0x5678
    let inst = decode_ok(&[0x81, 0x80, 0x34, 0x12, 0x78, 0x56]);
    assert_eq!(inst.length(), 6);
    assert_eq!(
        inst.operation(),
        &Operation::Arith {
            op: ArithOp::Add,
            width: Width::Word,
            dst: Operand::Memory(EffectiveAddress {
                base: AddressBase::BxSi,
                displacement: 0x1234,
                displacement_bytes: 2,
            }),
            src: Operand::Immediate(0x5678),
        }
    );
}

#[test]
fn test_far_transfers_read_offset_then_segment() {
    assert_eq!(
        decode_ok(&[0x9A, 0x78, 0x56, 0x34, 0x12]).operation(),
        &Operation::CallFar {
            segment: 0x1234,
            offset: 0x5678
        }
    );
}

#[test]
fn test_every_single_byte_opcode_decodes_with_enough_bytes() {
    // Whatever the opcode, ten trailing bytes are always enough.
    for opcode in 0..=255_u8 {
        let bytes = [opcode, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let inst = decode_ok(&bytes);
        assert!(inst.length() >= 1 && inst.length() <= bytes.len());
    }
}

#[test]
fn test_template_table_is_ordered_and_named() {
    let names = template_names();
    assert_eq!(names.first(), Some(&"arith r/m,reg"));
    assert!(names.contains(&"mov reg,imm"));
}

/// Decoding consumes exactly `length` bytes: cutting the stream off
/// just after the instruction gives the same result, and decoding
/// resumes cleanly at `start + length`.
#[proptest]
fn decode_length_invariant(bytes: Vec<u8>) {
    let mut start = 0;
    while start < bytes.len() {
        let mut source: &[u8] = &bytes;
        let inst = match decode(&mut source, start) {
            Ok(inst) => inst,
            Err(DecodeFailure::EndOfStream { position }) => {
                assert!(position >= start);
                assert_eq!(position, bytes.len());
                break;
            }
        };
        let len = inst.length();
        assert!(len >= 1);
        assert!(len <= 10, "8086 instructions are at most 10 bytes");
        let mut truncated: &[u8] = &bytes[..start + len];
        assert_eq!(decode(&mut truncated, start), Ok(inst));
        start += len;
    }
}
