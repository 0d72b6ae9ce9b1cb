//! The prelude exports the items most users of the base crate need:
//! the instruction contract, byte sources and operand widths.
pub use super::bitfield::{sign_extend, sign_extend_byte, BitPattern};
pub use super::instruction::{DecodeFailure, Inst};
pub use super::source::{ByteSource, Cursor};
pub use super::width::Width;
