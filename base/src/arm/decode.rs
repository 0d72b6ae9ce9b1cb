//! Hierarchical dispatch over the fields of an A32 instruction word.
//!
//! Each level extracts one or more fixed-position subfields and
//! compares them against documented bit patterns, narrowing the
//! instruction class until a concrete kind is found.  The order of the
//! comparisons within a level matters: earlier entries take priority,
//! exactly as in the architecture reference's decode tables.
use crate::bitfield::{bit, field, sign_extend, BitPattern};

use super::operation::{
    Condition, DataOp, HalfwordKind, HalfwordOffset, Indexing, Operation, Register, ShiftAmount,
    ShiftKind, ShifterOperand, TransferOffset,
};

// Data-processing and miscellaneous: op1 is bits 24-20, op2 bits 7-4.
const MISC_SPACE: BitPattern = BitPattern::new("10xx0");
const REGISTER_OP2: BitPattern = BitPattern::new("xxx0");
const REGISTER_SHIFTED_OP2: BitPattern = BitPattern::new("0xx1");
const MISC_OP2: BitPattern = BitPattern::new("0xxx");
const HALFWORD_MULTIPLY_OP2: BitPattern = BitPattern::new("1xx0");
const MULTIPLY_OP1: BitPattern = BitPattern::new("0xxxx");
const MULTIPLY_OP2: BitPattern = BitPattern::new("1001");
const UNPRIVILEGED_OP1: BitPattern = BitPattern::new("0xx1x");
const EXTRA_LOAD_STORE_OP2: BitPattern = BitPattern::new("1011");
const EXTRA_LOAD_STORE_SIGNED_OP2: BitPattern = BitPattern::new("11x1");
const MOVW_OP1: BitPattern = BitPattern::new("10000");
const MOVT_OP1: BitPattern = BitPattern::new("10100");
const MSR_IMMEDIATE_OP1: BitPattern = BitPattern::new("10x10");

// Multiply: bits 23-20.
const MUL: BitPattern = BitPattern::new("000x");
const MLA: BitPattern = BitPattern::new("001x");
const MULTIPLY_LONG: BitPattern = BitPattern::new("1xxx");

// Synchronization primitives: bits 23-20.
const SWP: BitPattern = BitPattern::new("0x00");

// Branch, branch with link and block transfer: bits 25-20.
const BLOCK_TRANSFER: BitPattern = BitPattern::new("0xxxxx");
const BRANCH: BitPattern = BitPattern::new("10xxxx");

// Coprocessor and supervisor call: bits 25-20.
const COPROCESSOR_UNDEFINED: BitPattern = BitPattern::new("00000x");
const SUPERVISOR_CALL: BitPattern = BitPattern::new("11xxxx");

// Unconditional space: bits 27-20.
const BLX_IMMEDIATE: BitPattern = BitPattern::new("101xxxxx");

// Media: bits 24-20 and 7-5 of the permanently undefined encoding.
const PERMANENTLY_UNDEFINED_OP1: BitPattern = BitPattern::new("11111");
const PERMANENTLY_UNDEFINED_OP2: BitPattern = BitPattern::new("111");

/// Classifies a complete instruction word.
pub(crate) fn decode_word(word: u32) -> (Condition, Operation) {
    let condition = Condition::from_field(field(word, 31, 28));
    if condition == Condition::Unconditional {
        return (condition, unconditional(word));
    }
    let op1 = field(word, 27, 25);
    let op = bit(word, 4);
    let operation = match op1 {
        0b000 | 0b001 => data_processing_and_misc(word),
        0b010 => single_transfer(word),
        0b011 if !op => single_transfer(word),
        0b011 => media(word),
        0b100 | 0b101 => branch_and_block(word),
        _ => coprocessor_and_supervisor(word),
    };
    (condition, operation)
}

fn data_processing_and_misc(word: u32) -> Operation {
    let immediate = bit(word, 25);
    let op1 = field(word, 24, 20);
    let op2 = field(word, 7, 4);
    if immediate {
        return if MOVW_OP1.matches(op1) || MOVT_OP1.matches(op1) {
            Operation::MoveWide {
                top: MOVT_OP1.matches(op1),
                rd: Register::new(field(word, 15, 12)),
                imm16: ((field(word, 19, 16) << 12) | field(word, 11, 0)) as u16,
            }
        } else if MSR_IMMEDIATE_OP1.matches(op1) {
            Operation::RegisterToStatus {
                saved: bit(word, 22),
                mask: field(word, 19, 16) as u8,
                operand: rotated_immediate(word),
            }
        } else {
            data_processing(word, rotated_immediate(word))
        };
    }
    if !MISC_SPACE.matches(op1) {
        if REGISTER_OP2.matches(op2) {
            return data_processing(word, shifted_register(word));
        }
        if REGISTER_SHIFTED_OP2.matches(op2) {
            return data_processing(word, register_shifted_register(word));
        }
    } else if MISC_OP2.matches(op2) {
        return miscellaneous(word);
    } else if HALFWORD_MULTIPLY_OP2.matches(op2) {
        // SMLA<x><y> and friends are not modeled.
        return Operation::Undefined { word };
    }
    if MULTIPLY_OP2.matches(op2) {
        return if MULTIPLY_OP1.matches(op1) {
            multiply(word)
        } else {
            synchronization(word)
        };
    }
    if EXTRA_LOAD_STORE_OP2.matches(op2) || EXTRA_LOAD_STORE_SIGNED_OP2.matches(op2) {
        if UNPRIVILEGED_OP1.matches(op1) {
            // LDRHT and the other unprivileged forms.
            return Operation::Undefined { word };
        }
        return extra_load_store(word);
    }
    Operation::Undefined { word }
}

fn data_processing(word: u32, operand: ShifterOperand) -> Operation {
    Operation::DataProcessing {
        op: DataOp::from_field(field(word, 24, 21)),
        set_flags: bit(word, 20),
        rn: Register::new(field(word, 19, 16)),
        rd: Register::new(field(word, 15, 12)),
        operand,
    }
}

fn rotated_immediate(word: u32) -> ShifterOperand {
    ShifterOperand::Immediate {
        imm8: field(word, 7, 0) as u8,
        rotate: field(word, 11, 8) as u8,
    }
}

fn shifted_register(word: u32) -> ShifterOperand {
    ShifterOperand::Register {
        rm: Register::new(field(word, 3, 0)),
        shift: ShiftKind::from_field(field(word, 6, 5)),
        amount: ShiftAmount::Immediate(field(word, 11, 7) as u8),
    }
}

fn register_shifted_register(word: u32) -> ShifterOperand {
    ShifterOperand::Register {
        rm: Register::new(field(word, 3, 0)),
        shift: ShiftKind::from_field(field(word, 6, 5)),
        amount: ShiftAmount::Register(Register::new(field(word, 11, 8))),
    }
}

fn miscellaneous(word: u32) -> Operation {
    let op = field(word, 22, 21);
    let op2 = field(word, 6, 4);
    let rm = Register::new(field(word, 3, 0));
    match (op2, op) {
        (0b000, 0b00 | 0b10) => Operation::StatusToRegister {
            saved: bit(word, 22),
            rd: Register::new(field(word, 15, 12)),
        },
        (0b000, _) => Operation::RegisterToStatus {
            saved: bit(word, 22),
            mask: field(word, 19, 16) as u8,
            operand: ShifterOperand::Register {
                rm,
                shift: ShiftKind::Lsl,
                amount: ShiftAmount::Immediate(0),
            },
        },
        (0b001, 0b01) => Operation::BranchExchange { link: false, rm },
        (0b001, 0b11) => Operation::CountLeadingZeros {
            rd: Register::new(field(word, 15, 12)),
            rm,
        },
        (0b011, 0b01) => Operation::BranchExchange { link: true, rm },
        (0b111, 0b01) => Operation::Breakpoint {
            comment: ((field(word, 19, 8) << 4) | field(word, 3, 0)) as u16,
        },
        _ => Operation::Undefined { word },
    }
}

fn multiply(word: u32) -> Operation {
    let op = field(word, 23, 20);
    let set_flags = bit(word, 20);
    let rs = Register::new(field(word, 11, 8));
    let rm = Register::new(field(word, 3, 0));
    if MUL.matches(op) || MLA.matches(op) {
        Operation::Multiply {
            accumulate: MLA.matches(op),
            set_flags,
            rd: Register::new(field(word, 19, 16)),
            rn: Register::new(field(word, 15, 12)),
            rs,
            rm,
        }
    } else if MULTIPLY_LONG.matches(op) {
        Operation::MultiplyLong {
            signed: bit(word, 22),
            accumulate: bit(word, 21),
            set_flags,
            rd_hi: Register::new(field(word, 19, 16)),
            rd_lo: Register::new(field(word, 15, 12)),
            rs,
            rm,
        }
    } else {
        // UMAAL and MLS.
        Operation::Undefined { word }
    }
}

fn synchronization(word: u32) -> Operation {
    if SWP.matches(field(word, 23, 20)) {
        Operation::Swap {
            byte: bit(word, 22),
            rn: Register::new(field(word, 19, 16)),
            rd: Register::new(field(word, 15, 12)),
            rm: Register::new(field(word, 3, 0)),
        }
    } else {
        // Exclusive loads and stores.
        Operation::Undefined { word }
    }
}

fn extra_load_store(word: u32) -> Operation {
    let load_bit = bit(word, 20);
    let (load, kind) = match field(word, 6, 5) {
        0b01 => (load_bit, HalfwordKind::UnsignedHalf),
        0b10 if load_bit => (true, HalfwordKind::SignedByte),
        0b10 => (true, HalfwordKind::Double),
        0b11 if load_bit => (true, HalfwordKind::SignedHalf),
        _ => (false, HalfwordKind::Double),
    };
    let offset = if bit(word, 22) {
        HalfwordOffset::Immediate(((field(word, 11, 8) << 4) | field(word, 3, 0)) as u8)
    } else {
        HalfwordOffset::Register(Register::new(field(word, 3, 0)))
    };
    Operation::HalfwordTransfer {
        load,
        kind,
        indexing: Indexing::from_word(word),
        rn: Register::new(field(word, 19, 16)),
        rd: Register::new(field(word, 15, 12)),
        offset,
    }
}

fn single_transfer(word: u32) -> Operation {
    let offset = if bit(word, 25) {
        TransferOffset::Register {
            rm: Register::new(field(word, 3, 0)),
            shift: ShiftKind::from_field(field(word, 6, 5)),
            amount: field(word, 11, 7) as u8,
        }
    } else {
        TransferOffset::Immediate(field(word, 11, 0) as u16)
    };
    Operation::SingleTransfer {
        load: bit(word, 20),
        byte: bit(word, 22),
        indexing: Indexing::from_word(word),
        rn: Register::new(field(word, 19, 16)),
        rd: Register::new(field(word, 15, 12)),
        offset,
    }
}

fn media(word: u32) -> Operation {
    if PERMANENTLY_UNDEFINED_OP1.matches(field(word, 24, 20))
        && PERMANENTLY_UNDEFINED_OP2.matches(field(word, 7, 5))
    {
        Operation::Undefined { word }
    } else {
        Operation::Media { word }
    }
}

fn branch_offset(word: u32) -> i32 {
    sign_extend(field(word, 23, 0), 24) << 2
}

fn branch_and_block(word: u32) -> Operation {
    let op = field(word, 25, 20);
    if BLOCK_TRANSFER.matches(op) {
        Operation::BlockTransfer {
            load: bit(word, 20),
            indexing: Indexing::from_word(word),
            user_bank: bit(word, 22),
            rn: Register::new(field(word, 19, 16)),
            registers: field(word, 15, 0) as u16,
        }
    } else {
        Operation::Branch {
            link: !BRANCH.matches(op),
            offset: branch_offset(word),
        }
    }
}

fn coprocessor_and_supervisor(word: u32) -> Operation {
    let op1 = field(word, 25, 20);
    if COPROCESSOR_UNDEFINED.matches(op1) {
        Operation::Undefined { word }
    } else if SUPERVISOR_CALL.matches(op1) {
        Operation::SupervisorCall {
            comment: field(word, 23, 0),
        }
    } else {
        Operation::Coprocessor { word }
    }
}

fn unconditional(word: u32) -> Operation {
    if BLX_IMMEDIATE.matches(field(word, 27, 20)) {
        let halfword = if bit(word, 24) { 2 } else { 0 };
        Operation::BranchLinkExchange {
            offset: branch_offset(word) | halfword,
        }
    } else {
        Operation::Unconditional { word }
    }
}
