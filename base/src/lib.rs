//! The `base` crate defines the representation of instructions for
//! the architectures we emulate: how they are decoded from a byte
//! stream and how they are disassembled.  The idea is that a
//! disassembler or other tooling would depend on the base crate but
//! would not need to depend on the emulator library itself.

pub mod arm;
pub mod bitfield;
pub mod instruction;
pub mod prelude;
pub mod source;
pub mod width;
pub mod x86;
