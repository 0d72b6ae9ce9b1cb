//! Operand widths.
//!
//! The 8086 operates on bytes and on 16-bit words; most opcodes
//! carry a "w" bit selecting between the two.  Values of either width
//! are carried around in a `u16` and masked to the width at the point
//! where the width matters.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    /// Selects the width from the low bit of an opcode (the "w" bit).
    #[must_use]
    pub const fn from_w_bit(opcode: u8) -> Width {
        if opcode & 1 == 0 {
            Width::Byte
        } else {
            Width::Word
        }
    }

    #[must_use]
    pub const fn bytes(self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
        }
    }

    /// All-ones value of this width.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Width::Byte => 0x00FF,
            Width::Word => 0xFFFF,
        }
    }

    /// The most significant (sign) bit of a value of this width.
    #[must_use]
    pub const fn sign_bit(self) -> u16 {
        match self {
            Width::Byte => 0x0080,
            Width::Word => 0x8000,
        }
    }

    #[must_use]
    pub const fn truncate(self, value: u32) -> u16 {
        (value as u16) & self.mask()
    }

    #[must_use]
    pub const fn is_negative(self, value: u16) -> bool {
        value & self.sign_bit() != 0
    }

    /// Interprets `value` as a two's complement number of this width.
    #[must_use]
    pub const fn to_signed(self, value: u16) -> i32 {
        match self {
            Width::Byte => (value as u8) as i8 as i32,
            Width::Word => value as i16 as i32,
        }
    }
}

impl Display for Width {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Width::Byte => "BYTE",
            Width::Word => "WORD",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Width;
    use test_strategy::proptest;

    #[test]
    fn test_w_bit() {
        assert_eq!(Width::from_w_bit(0x04), Width::Byte);
        assert_eq!(Width::from_w_bit(0x05), Width::Word);
        assert_eq!(Width::from_w_bit(0xB8), Width::Byte);
    }

    #[test]
    fn test_to_signed() {
        assert_eq!(Width::Byte.to_signed(0xFF), -1);
        assert_eq!(Width::Byte.to_signed(0x7F), 127);
        assert_eq!(Width::Byte.to_signed(0x180), -128);
        assert_eq!(Width::Word.to_signed(0x8000), -32768);
    }

    #[proptest]
    fn truncate_stays_within_mask(width: Width, value: u32) {
        let t = width.truncate(value);
        assert_eq!(t & !width.mask(), 0);
        assert_eq!(u32::from(t), value & u32::from(width.mask()));
    }
}
