//! The contract shared by the decoded instructions of every
//! architecture the emulator supports.
//!
//! Each architecture (see [`crate::x86`] and [`crate::arm`]) defines
//! its own instruction type carrying whatever operand information its
//! encodings need.  The pipeline only needs the small amount of
//! information exposed by [`Inst`]: how long the encoding was, roughly
//! how long it takes, and whether it transfers control.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

pub trait Inst {
    /// The numeric opcode.  For x86 this is the opcode byte following
    /// any prefixes; for ARM it is bits 27-20 of the instruction word.
    fn opcode_number(&self) -> u32;

    /// The number of bytes occupied by the encoding, including any
    /// prefix bytes.
    fn length(&self) -> usize;

    /// An estimate of the number of clock cycles the instruction
    /// takes to execute.
    fn clocks(&self) -> u32;

    /// Indicates that execution of the instruction sets the program
    /// counter directly, instead of simply moving on to the following
    /// instruction.
    fn writes_program_counter(&self) -> bool;

    /// Indicates that the target of a control transfer is encoded in
    /// the instruction itself, as opposed to being computed from
    /// register or memory contents.
    fn has_static_target(&self) -> bool;

    /// Indicates that the encoding was not recognised.
    fn is_unknown(&self) -> bool;
}

/// Decoding of a well-formed byte stream never fails; the only
/// failure is running out of bytes part way through an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeFailure {
    /// The byte source has no byte at `position`.
    EndOfStream { position: usize },
}

impl Display for DecodeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeFailure::EndOfStream { position } => {
                write!(f, "instruction stream ended at position {position}")
            }
        }
    }
}

impl Error for DecodeFailure {}
