use test_strategy::proptest;

use super::*;
use crate::instruction::{DecodeFailure, Inst};

fn word(w: u32) -> Instruction {
    Instruction::from_word(w)
}

#[test]
fn test_data_processing_immediate() {
    // MOV R1, #5
    let inst = word(0xE3A0_1005);
    assert_eq!(inst.condition(), Condition::Always);
    assert_eq!(
        inst.operation(),
        &Operation::DataProcessing {
            op: DataOp::Mov,
            set_flags: false,
            rn: Register::new(0),
            rd: Register::new(1),
            operand: ShifterOperand::Immediate { imm8: 5, rotate: 0 },
        }
    );
    assert_eq!(inst.to_string(), "MOV R1, #0x5");
}

#[test]
fn test_rotated_immediate_value() {
    // MOV R0, #0xFF000000 is 0xFF rotated right by 8.
    let inst = word(0xE3A0_04FF);
    let Operation::DataProcessing { operand, .. } = *inst.operation() else {
        panic!("expected data processing");
    };
    assert_eq!(operand.immediate_value(), Some(0xFF00_0000));
}

#[test]
fn test_data_processing_register_forms() {
    // ADDS R2, R3, R4, LSL #2
    assert_eq!(
        word(0xE093_2104).operation(),
        &Operation::DataProcessing {
            op: DataOp::Add,
            set_flags: true,
            rn: Register::new(3),
            rd: Register::new(2),
            operand: ShifterOperand::Register {
                rm: Register::new(4),
                shift: ShiftKind::Lsl,
                amount: ShiftAmount::Immediate(2),
            },
        }
    );
    // SUBNE R0, R1, R2, ASR R3
    let inst = word(0x1041_0352);
    assert_eq!(inst.condition(), Condition::Ne);
    assert_eq!(
        inst.operation(),
        &Operation::DataProcessing {
            op: DataOp::Sub,
            set_flags: false,
            rn: Register::new(1),
            rd: Register::new(0),
            operand: ShifterOperand::Register {
                rm: Register::new(2),
                shift: ShiftKind::Asr,
                amount: ShiftAmount::Register(Register::new(3)),
            },
        }
    );
    assert_eq!(inst.to_string(), "SUBNE R0, R1, R2, ASR R3");
}

#[test]
fn test_comparison_without_s_is_miscellaneous() {
    // Bits 24-20 of 10xx0 are not TST/TEQ/CMP/CMN; they select the
    // miscellaneous space.  0xE12FFF1E is BX LR.
    assert_eq!(
        word(0xE12F_FF1E).operation(),
        &Operation::BranchExchange {
            link: false,
            rm: Register::LR,
        }
    );
    // CMP R0, #1 has S set and stays data processing.
    assert!(matches!(
        word(0xE350_0001).operation(),
        Operation::DataProcessing {
            op: DataOp::Cmp,
            set_flags: true,
            ..
        }
    ));
    // CLZ R0, R1
    assert_eq!(
        word(0xE16F_0F11).operation(),
        &Operation::CountLeadingZeros {
            rd: Register::new(0),
            rm: Register::new(1),
        }
    );
    // MRS R0, CPSR
    assert_eq!(
        word(0xE10F_0000).operation(),
        &Operation::StatusToRegister {
            saved: false,
            rd: Register::new(0),
        }
    );
}

#[test]
fn test_multiply_and_swap() {
    // MUL R0, R1, R2
    assert_eq!(
        word(0xE000_0291).operation(),
        &Operation::Multiply {
            accumulate: false,
            set_flags: false,
            rd: Register::new(0),
            rn: Register::new(0),
            rs: Register::new(2),
            rm: Register::new(1),
        }
    );
    // UMULL R0, R1, R2, R3
    assert_eq!(
        word(0xE081_0392).operation(),
        &Operation::MultiplyLong {
            signed: false,
            accumulate: false,
            set_flags: false,
            rd_hi: Register::new(1),
            rd_lo: Register::new(0),
            rs: Register::new(3),
            rm: Register::new(2),
        }
    );
    // SWPB R0, R1, [R2]
    assert_eq!(
        word(0xE142_0091).operation(),
        &Operation::Swap {
            byte: true,
            rn: Register::new(2),
            rd: Register::new(0),
            rm: Register::new(1),
        }
    );
}

#[test]
fn test_move_wide() {
    // MOVW R0, #0x1234 and MOVT R0, #0x5678
    assert_eq!(
        word(0xE301_0234).operation(),
        &Operation::MoveWide {
            top: false,
            rd: Register::new(0),
            imm16: 0x1234,
        }
    );
    assert_eq!(
        word(0xE345_0678).operation(),
        &Operation::MoveWide {
            top: true,
            rd: Register::new(0),
            imm16: 0x5678,
        }
    );
}

#[test]
fn test_loads_and_stores() {
    // LDR R0, [R1, #4]
    let inst = word(0xE591_0004);
    assert_eq!(
        inst.operation(),
        &Operation::SingleTransfer {
            load: true,
            byte: false,
            indexing: Indexing {
                pre_index: true,
                add: true,
                write_back: false,
            },
            rn: Register::new(1),
            rd: Register::new(0),
            offset: TransferOffset::Immediate(4),
        }
    );
    assert_eq!(inst.to_string(), "LDR R0, [R1, #0x4]");
    // STRB R2, [R3], #-1
    let inst = word(0xE443_2001);
    assert!(matches!(
        inst.operation(),
        Operation::SingleTransfer {
            load: false,
            byte: true,
            indexing: Indexing {
                pre_index: false,
                add: false,
                ..
            },
            ..
        }
    ));
    assert_eq!(inst.to_string(), "STRB R2, [R3], #-0x1");
    // LDRH R0, [R1, #2]
    assert_eq!(
        word(0xE1D1_00B2).operation(),
        &Operation::HalfwordTransfer {
            load: true,
            kind: HalfwordKind::UnsignedHalf,
            indexing: Indexing {
                pre_index: true,
                add: true,
                write_back: false,
            },
            rn: Register::new(1),
            rd: Register::new(0),
            offset: HalfwordOffset::Immediate(2),
        }
    );
    // LDRSB R0, [R1, R2]
    assert!(matches!(
        word(0xE191_00D2).operation(),
        Operation::HalfwordTransfer {
            load: true,
            kind: HalfwordKind::SignedByte,
            offset: HalfwordOffset::Register(_),
            ..
        }
    ));
}

#[test]
fn test_block_transfer() {
    // STMDB SP!, {R4, LR}
    let inst = word(0xE92D_4010);
    assert_eq!(
        inst.operation(),
        &Operation::BlockTransfer {
            load: false,
            indexing: Indexing {
                pre_index: true,
                add: false,
                write_back: true,
            },
            user_bank: false,
            rn: Register::SP,
            registers: 0x4010,
        }
    );
    assert_eq!(inst.to_string(), "STMDB SP!, {R4, LR}");
    // LDMIA SP!, {R4, PC} writes the program counter.
    assert!(word(0xE8BD_8010).writes_program_counter());
}

#[test]
fn test_branch_offsets_are_sign_extended_words() {
    // B . (branch to self): imm24 = -2.
    let inst = word(0xEAFF_FFFE);
    assert_eq!(
        inst.operation(),
        &Operation::Branch {
            link: false,
            offset: -8
        }
    );
    assert!(inst.writes_program_counter());
    assert!(inst.has_static_target());
    assert_eq!(inst.to_string(), "B $+0x0");
    // BL with a forward offset of 0x100 words.
    assert_eq!(
        word(0xEB00_0100).operation(),
        &Operation::Branch {
            link: true,
            offset: 0x400
        }
    );
}

#[test]
fn test_supervisor_call_and_coprocessor() {
    assert_eq!(
        word(0xEF00_0011).operation(),
        &Operation::SupervisorCall { comment: 0x11 }
    );
    // MRC p15, 0, R0, c1, c0, 0
    assert!(matches!(
        word(0xEE11_0F10).operation(),
        Operation::Coprocessor { .. }
    ));
}

#[test]
fn test_unconditional_and_undefined_classification() {
    // BLX with H set lands on a halfword.
    let inst = word(0xFB00_0000);
    assert_eq!(inst.condition(), Condition::Unconditional);
    assert_eq!(
        inst.operation(),
        &Operation::BranchLinkExchange { offset: 2 }
    );
    // PLD [R0] lives in the unconditional space but is not modeled.
    assert!(matches!(
        word(0xF5D0_F000).operation(),
        Operation::Unconditional { .. }
    ));
    // The permanently undefined encoding in the media space.
    let udf = word(0xE7F0_00F0);
    assert!(udf.is_unknown());
    // UADD8 R0, R1, R2 is media.
    assert!(matches!(
        word(0xE651_0F92).operation(),
        Operation::Media { .. }
    ));
}

#[test]
fn test_decode_reads_little_endian_words() {
    let bytes = [0x05, 0x10, 0xA0, 0xE3, 0x1E, 0xFF, 0x2F, 0xE1];
    let mut source: &[u8] = &bytes;
    let first = decode(&mut source, 0).expect("full word available");
    assert_eq!(first.word(), 0xE3A0_1005);
    assert_eq!(first.length(), 4);
    let second = decode(&mut source, 4).expect("full word available");
    assert_eq!(second.to_string(), "BX LR");
    assert_eq!(
        decode_slice(&bytes[..3]),
        Err(DecodeFailure::EndOfStream { position: 3 })
    );
}

#[test]
fn test_condition_evaluation() {
    assert!(Condition::Eq.holds(false, true, false, false));
    assert!(!Condition::Eq.holds(false, false, false, false));
    assert!(Condition::Ge.holds(true, false, false, true));
    assert!(Condition::Lt.holds(true, false, false, false));
    assert!(Condition::Hi.holds(false, false, true, false));
    assert!(!Condition::Hi.holds(false, true, true, false));
}

#[proptest]
fn every_word_decodes_to_four_bytes(w: u32) {
    let inst = decode_slice(&w.to_le_bytes()).expect("four bytes is a full word");
    assert_eq!(inst.length(), INSTRUCTION_LENGTH);
    assert_eq!(inst.word(), w);
    assert!(inst.clocks() >= 1);
}

#[proptest]
fn condition_and_its_inverse_disagree(cond: Condition, n: bool, z: bool, c: bool, v: bool) {
    // Conditions come in pairs differing only in bit 0.
    let field = cond.field();
    assert_eq!(Condition::from_field(field), cond);
    if field < 14 {
        let inverse = Condition::from_field(field ^ 1);
        assert_ne!(cond.holds(n, z, c, v), inverse.holds(n, z, c, v));
    }
}
