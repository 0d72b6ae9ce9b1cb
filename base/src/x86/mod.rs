//! Decoding of 8086 (real mode, 16-bit) instructions.
//!
//! Decoding proceeds in three steps:
//!
//! 1. up to [`prefix::MAX_PREFIXES`] prefix bytes are consumed;
//! 2. the opcode byte is offered to each entry of the template table
//!    in turn (see [`templates`]), and the first template which
//!    matches parses the rest of the instruction;
//! 3. if no template matches, the extension ("group") decoder is
//!    tried, and failing that the instruction decodes as
//!    [`Operation::Unknown`].
//!
//! Decoding never fails for a well-formed byte stream.  The only
//! error is running out of bytes part way through an instruction.
use serde::Serialize;

use crate::instruction::{DecodeFailure, Inst};
use crate::source::{ByteSource, Cursor};

mod format;
mod group;
pub mod modrm;
pub mod operand;
pub mod operation;
pub mod prefix;
pub mod registers;
mod templates;
pub mod timing;

#[cfg(test)]
mod tests;

pub use operand::{AddressBase, EffectiveAddress, Operand, Port};
pub use operation::{
    AdjustOp, ArithOp, Condition, FlagOp, IncDecOp, LoopOp, MulDivOp, Operation, ShiftCount,
    ShiftOp, StringOp, UnaryOp,
};
pub use prefix::{Prefixes, Repeat};
pub use registers::{ByteRegister, Register, SegmentRegister, WordRegister};

/// A decoded 8086 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Instruction {
    opcode: u8,
    prefixes: Prefixes,
    operation: Operation,
    length: usize,
    clocks: u32,
}

impl Instruction {
    /// The opcode byte (the first byte after any prefixes).
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    #[must_use]
    pub fn prefixes(&self) -> &Prefixes {
        &self.prefixes
    }

    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The segment through which a memory operand is accessed: the
    /// segment override prefix if there is one, otherwise the
    /// default segment for the addressing mode.
    #[must_use]
    pub fn segment_for(&self, address: &EffectiveAddress) -> SegmentRegister {
        self.prefixes
            .segment
            .unwrap_or_else(|| address.default_segment())
    }
}

impl Inst for Instruction {
    fn opcode_number(&self) -> u32 {
        u32::from(self.opcode)
    }

    fn length(&self) -> usize {
        self.length
    }

    fn clocks(&self) -> u32 {
        self.clocks
    }

    fn writes_program_counter(&self) -> bool {
        self.operation.writes_program_counter()
    }

    fn has_static_target(&self) -> bool {
        self.operation.has_static_target()
    }

    fn is_unknown(&self) -> bool {
        matches!(self.operation, Operation::Unknown)
    }
}

/// Decodes the instruction which begins at index `start` of `source`.
/// The returned instruction's length counts any prefix bytes, so the
/// next instruction begins at `start + length`.
pub fn decode(source: &mut dyn ByteSource, start: usize) -> Result<Instruction, DecodeFailure> {
    let mut cursor = Cursor::new(source, start);
    let prefixes = prefix::strip_prefixes(&mut cursor)?;
    let opcode = cursor.next_byte()?;
    let operation = match templates::find_template(opcode) {
        Some(template) => (template.parse)(opcode, &mut cursor)?,
        None => group::decode_extension(opcode, &mut cursor)?.unwrap_or(Operation::Unknown),
    };
    Ok(Instruction {
        opcode,
        prefixes,
        operation,
        length: cursor.consumed(),
        clocks: timing::estimate_clocks(&operation, &prefixes),
    })
}

/// Decodes the instruction at the start of `bytes`.
pub fn decode_slice(bytes: &[u8]) -> Result<Instruction, DecodeFailure> {
    let mut source: &[u8] = bytes;
    decode(&mut source, 0)
}

/// Names of the templates in the decoder table, in priority order.
#[must_use]
pub fn template_names() -> Vec<&'static str> {
    templates::TEMPLATES.iter().map(|t| t.name).collect()
}
