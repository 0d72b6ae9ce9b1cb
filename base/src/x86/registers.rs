//! Register names as they appear in 8086 instruction encodings.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

use crate::width::Width;

/// Byte registers, in encoding order.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ByteRegister {
    AL,
    CL,
    DL,
    BL,
    AH,
    CH,
    DH,
    BH,
}

/// Word registers, in encoding order.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum WordRegister {
    AX,
    CX,
    DX,
    BX,
    SP,
    BP,
    SI,
    DI,
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SegmentRegister {
    ES,
    CS,
    SS,
    DS,
}

impl ByteRegister {
    pub const ALL: [ByteRegister; 8] = [
        ByteRegister::AL,
        ByteRegister::CL,
        ByteRegister::DL,
        ByteRegister::BL,
        ByteRegister::AH,
        ByteRegister::CH,
        ByteRegister::DH,
        ByteRegister::BH,
    ];

    /// Decodes a three-bit register field.  Only the low three bits
    /// of `n` are used.
    #[must_use]
    pub const fn from_index(n: u8) -> ByteRegister {
        ByteRegister::ALL[(n & 7) as usize]
    }

    /// The word register holding this byte register, and whether the
    /// byte is the high half of it.
    #[must_use]
    pub const fn container(self) -> (WordRegister, bool) {
        match self {
            ByteRegister::AL => (WordRegister::AX, false),
            ByteRegister::CL => (WordRegister::CX, false),
            ByteRegister::DL => (WordRegister::DX, false),
            ByteRegister::BL => (WordRegister::BX, false),
            ByteRegister::AH => (WordRegister::AX, true),
            ByteRegister::CH => (WordRegister::CX, true),
            ByteRegister::DH => (WordRegister::DX, true),
            ByteRegister::BH => (WordRegister::BX, true),
        }
    }
}

impl WordRegister {
    pub const ALL: [WordRegister; 8] = [
        WordRegister::AX,
        WordRegister::CX,
        WordRegister::DX,
        WordRegister::BX,
        WordRegister::SP,
        WordRegister::BP,
        WordRegister::SI,
        WordRegister::DI,
    ];

    #[must_use]
    pub const fn from_index(n: u8) -> WordRegister {
        WordRegister::ALL[(n & 7) as usize]
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl SegmentRegister {
    pub const ALL: [SegmentRegister; 4] = [
        SegmentRegister::ES,
        SegmentRegister::CS,
        SegmentRegister::SS,
        SegmentRegister::DS,
    ];

    /// Decodes a two-bit segment register field.
    #[must_use]
    pub const fn from_index(n: u8) -> SegmentRegister {
        SegmentRegister::ALL[(n & 3) as usize]
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A general register of either width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Register {
    Byte(ByteRegister),
    Word(WordRegister),
}

impl Register {
    #[must_use]
    pub const fn from_index(width: Width, n: u8) -> Register {
        match width {
            Width::Byte => Register::Byte(ByteRegister::from_index(n)),
            Width::Word => Register::Word(WordRegister::from_index(n)),
        }
    }

    #[must_use]
    pub const fn width(self) -> Width {
        match self {
            Register::Byte(_) => Width::Byte,
            Register::Word(_) => Width::Word,
        }
    }

    /// The accumulator (AL or AX) of the given width.
    #[must_use]
    pub const fn accumulator(width: Width) -> Register {
        Register::from_index(width, 0)
    }
}

impl Display for ByteRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt::Debug::fmt(self, f)
    }
}

impl Display for WordRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt::Debug::fmt(self, f)
    }
}

impl Display for SegmentRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt::Debug::fmt(self, f)
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Register::Byte(r) => r.fmt(f),
            Register::Word(r) => r.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_encoding_order() {
        assert_eq!(ByteRegister::from_index(4), ByteRegister::AH);
        assert_eq!(WordRegister::from_index(4), WordRegister::SP);
        assert_eq!(SegmentRegister::from_index(2), SegmentRegister::SS);
        assert_eq!(Register::accumulator(Width::Word), Register::Word(WordRegister::AX));
    }

    #[proptest]
    fn byte_registers_live_in_general_registers(r: ByteRegister) {
        let (container, high) = r.container();
        assert!(container.index() < 4);
        assert_eq!(high, r as u8 >= 4);
        assert_eq!(container.index(), (r as usize) & 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(Register::Byte(ByteRegister::BH).to_string(), "BH");
        assert_eq!(SegmentRegister::DS.to_string(), "DS");
    }
}
