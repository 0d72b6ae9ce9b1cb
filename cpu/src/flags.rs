//! The 8086 FLAGS register.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

#[cfg(test)]
use test_strategy::Arbitrary;

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Flag {
    Carry,
    Parity,
    AuxiliaryCarry,
    Zero,
    Sign,
    Trap,
    InterruptEnable,
    Direction,
    Overflow,
}

impl Flag {
    pub const ALL: [Flag; 9] = [
        Flag::Overflow,
        Flag::Direction,
        Flag::InterruptEnable,
        Flag::Trap,
        Flag::Sign,
        Flag::Zero,
        Flag::AuxiliaryCarry,
        Flag::Parity,
        Flag::Carry,
    ];

    #[must_use]
    pub const fn mask(self) -> u16 {
        1 << match self {
            Flag::Carry => 0,
            Flag::Parity => 2,
            Flag::AuxiliaryCarry => 4,
            Flag::Zero => 6,
            Flag::Sign => 7,
            Flag::Trap => 8,
            Flag::InterruptEnable => 9,
            Flag::Direction => 10,
            Flag::Overflow => 11,
        }
    }

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Flag::Carry => 'C',
            Flag::Parity => 'P',
            Flag::AuxiliaryCarry => 'A',
            Flag::Zero => 'Z',
            Flag::Sign => 'S',
            Flag::Trap => 'T',
            Flag::InterruptEnable => 'I',
            Flag::Direction => 'D',
            Flag::Overflow => 'O',
        }
    }
}

/// Bits which always read as 1 on the 8086 (bit 1 and bits 12-15).
const RESERVED_ONES: u16 = 0xF002;

/// Bits which POPF, IRET and SAHF can change.
const WRITABLE: u16 = 0x0FD5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Flags {
    bits: u16,
}

impl Flags {
    #[must_use]
    pub const fn new() -> Flags {
        Flags { bits: 0 }
    }

    #[must_use]
    pub const fn get(&self, flag: Flag) -> bool {
        self.bits & flag.mask() != 0
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        if value {
            self.bits |= flag.mask();
        } else {
            self.bits &= !flag.mask();
        }
    }

    /// The value PUSHF stores.
    #[must_use]
    pub const fn bits(&self) -> u16 {
        (self.bits & WRITABLE) | RESERVED_ONES
    }

    /// Loads the flags from a value (for POPF and IRET).  Reserved
    /// bits are ignored.
    pub fn restore(&mut self, value: u16) {
        self.bits = value & WRITABLE;
    }

    /// The low byte, as LAHF reads it.
    #[must_use]
    pub const fn low_byte(&self) -> u8 {
        (self.bits() & 0xFF) as u8
    }

    /// Sets SF, ZF, AF, PF and CF from the bits of AH (SAHF).
    pub fn restore_low_byte(&mut self, value: u8) {
        const SAHF_MASK: u16 = 0x00D5;
        self.bits = (self.bits & !SAHF_MASK) | (u16::from(value) & SAHF_MASK);
    }
}

impl Display for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        for flag in Flag::ALL {
            let c = if self.get(flag) { flag.letter() } else { '-' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_reserved_bits_read_as_one() {
        let flags = Flags::new();
        assert_eq!(flags.bits(), 0xF002);
    }

    #[test]
    fn test_display() {
        let mut flags = Flags::new();
        flags.set(Flag::Zero, true);
        flags.set(Flag::Carry, true);
        assert_eq!(flags.to_string(), "-----Z--C");
    }

    #[test]
    fn test_sahf_leaves_high_flags_alone() {
        let mut flags = Flags::new();
        flags.set(Flag::Overflow, true);
        flags.restore_low_byte(0xFF);
        assert!(flags.get(Flag::Overflow));
        assert!(flags.get(Flag::Sign));
        assert!(flags.get(Flag::Carry));
        assert_eq!(flags.low_byte(), 0xD7);
    }

    #[proptest]
    fn set_then_get(flag: Flag, value: bool, start: u16) {
        let mut flags = Flags::new();
        flags.restore(start);
        flags.set(flag, value);
        assert_eq!(flags.get(flag), value);
        for other in Flag::ALL.into_iter().filter(|f| *f != flag) {
            assert_eq!(flags.get(other), start & other.mask() != 0);
        }
    }

    #[proptest]
    fn restore_then_bits(value: u16) {
        let mut flags = Flags::new();
        flags.restore(value);
        assert_eq!(flags.bits(), (value & 0x0FD5) | 0xF002);
    }
}
