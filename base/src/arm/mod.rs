//! Decoding of 32-bit ARM (A32) instructions.
//!
//! Only the classic ARM instruction set is covered, and the decoder
//! recognises more than the emulator executes: coprocessor and media
//! encodings are classified but carry nothing beyond their raw word.
//! Thumb is not decoded at all.
use serde::Serialize;

use crate::bitfield::field;
use crate::instruction::{DecodeFailure, Inst};
use crate::source::{ByteSource, Cursor};

mod decode;
mod format;
pub mod operation;

#[cfg(test)]
mod tests;

pub use operation::{
    Condition, DataOp, HalfwordKind, HalfwordOffset, Indexing, Operation, Register, ShiftAmount,
    ShiftKind, ShifterOperand, TransferOffset,
};

/// Every A32 instruction is one word long.
pub const INSTRUCTION_LENGTH: usize = 4;

/// A decoded ARM instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Instruction {
    word: u32,
    condition: Condition,
    operation: Operation,
    clocks: u32,
}

impl Instruction {
    /// Classifies an instruction word.  This cannot fail.
    #[must_use]
    pub fn from_word(word: u32) -> Instruction {
        let (condition, operation) = decode::decode_word(word);
        Instruction {
            word,
            condition,
            operation,
            clocks: estimate_clocks(&operation),
        }
    }

    #[must_use]
    pub fn word(&self) -> u32 {
        self.word
    }

    #[must_use]
    pub fn condition(&self) -> Condition {
        self.condition
    }

    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }
}

impl Inst for Instruction {
    fn opcode_number(&self) -> u32 {
        field(self.word, 27, 20)
    }

    fn length(&self) -> usize {
        INSTRUCTION_LENGTH
    }

    fn clocks(&self) -> u32 {
        self.clocks
    }

    fn writes_program_counter(&self) -> bool {
        match self.operation {
            Operation::DataProcessing { op, rd, .. } => rd.is_pc() && !op.is_comparison(),
            Operation::MoveWide { rd, .. } => rd.is_pc(),
            Operation::SingleTransfer { load, rd, .. } => load && rd.is_pc(),
            Operation::BlockTransfer {
                load, registers, ..
            } => load && registers & 0x8000 != 0,
            Operation::Branch { .. }
            | Operation::BranchLinkExchange { .. }
            | Operation::BranchExchange { .. }
            | Operation::SupervisorCall { .. } => true,
            _ => false,
        }
    }

    fn has_static_target(&self) -> bool {
        matches!(
            self.operation,
            Operation::Branch { .. } | Operation::BranchLinkExchange { .. }
        )
    }

    fn is_unknown(&self) -> bool {
        matches!(self.operation, Operation::Undefined { .. })
    }
}

/// Rough ARM7-style cycle counts: one cycle for most data processing,
/// extra cycles for register-specified shifts, memory and refilling
/// the pipeline after a branch.
fn estimate_clocks(operation: &Operation) -> u32 {
    const REFILL: u32 = 2;
    match operation {
        Operation::DataProcessing { rd, operand, op, .. } => {
            let shift = match operand {
                ShifterOperand::Register {
                    amount: ShiftAmount::Register(_),
                    ..
                } => 1,
                _ => 0,
            };
            let refill = if rd.is_pc() && !op.is_comparison() {
                REFILL
            } else {
                0
            };
            1 + shift + refill
        }
        Operation::Multiply { accumulate, .. } => 2 + u32::from(*accumulate),
        Operation::MultiplyLong { accumulate, .. } => 3 + u32::from(*accumulate),
        Operation::Swap { .. } => 4,
        Operation::SingleTransfer { load: true, rd, .. } => {
            3 + if rd.is_pc() { REFILL } else { 0 }
        }
        Operation::HalfwordTransfer { load: true, .. } => 3,
        Operation::SingleTransfer { .. } | Operation::HalfwordTransfer { .. } => 2,
        Operation::BlockTransfer {
            load, registers, ..
        } => {
            let n = registers.count_ones();
            if *load {
                n + 2 + if registers & 0x8000 != 0 { REFILL } else { 0 }
            } else {
                n + 1
            }
        }
        Operation::Branch { .. }
        | Operation::BranchLinkExchange { .. }
        | Operation::BranchExchange { .. }
        | Operation::SupervisorCall { .. }
        | Operation::Breakpoint { .. }
        | Operation::Undefined { .. }
        | Operation::Coprocessor { .. }
        | Operation::Media { .. }
        | Operation::Unconditional { .. } => 1 + REFILL,
        Operation::MoveWide { .. }
        | Operation::StatusToRegister { .. }
        | Operation::RegisterToStatus { .. }
        | Operation::CountLeadingZeros { .. } => 1,
    }
}

/// Decodes the little-endian instruction word at index `start` of
/// `source`.
pub fn decode(source: &mut dyn ByteSource, start: usize) -> Result<Instruction, DecodeFailure> {
    let mut cursor = Cursor::new(source, start);
    let word = cursor.next_u32()?;
    Ok(Instruction::from_word(word))
}

pub fn decode_slice(bytes: &[u8]) -> Result<Instruction, DecodeFailure> {
    let mut source: &[u8] = bytes;
    decode(&mut source, 0)
}
