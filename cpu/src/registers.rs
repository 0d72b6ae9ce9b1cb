//! Register storage.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use base::x86::{ByteRegister, Register, SegmentRegister, WordRegister};

use crate::flags::Flags;

/// A 16-bit register whose high and low bytes are also independently
/// addressable (AX as AH and AL, and so on).  All three views share
/// the same storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DividableRegister {
    value: u16,
}

impl DividableRegister {
    #[must_use]
    pub const fn new(value: u16) -> DividableRegister {
        DividableRegister { value }
    }

    #[must_use]
    pub const fn word(&self) -> u16 {
        self.value
    }

    #[must_use]
    pub const fn low(&self) -> u8 {
        (self.value & 0xFF) as u8
    }

    #[must_use]
    pub const fn high(&self) -> u8 {
        (self.value >> 8) as u8
    }

    pub fn set_word(&mut self, value: u16) {
        self.value = value;
    }

    pub fn set_low(&mut self, value: u8) {
        self.value = (self.value & 0xFF00) | u16::from(value);
    }

    pub fn set_high(&mut self, value: u8) {
        self.value = (self.value & 0x00FF) | (u16::from(value) << 8);
    }
}

/// The 8086 register file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterFile {
    /// AX, CX, DX, BX in encoding order.
    general: [DividableRegister; 4],
    /// SP, BP, SI, DI in encoding order.
    pointers: [u16; 4],
    /// ES, CS, SS, DS in encoding order.
    segments: [u16; 4],
    pub ip: u16,
    pub flags: Flags,
}

impl RegisterFile {
    #[must_use]
    pub fn new() -> RegisterFile {
        RegisterFile::default()
    }

    #[must_use]
    pub fn word(&self, reg: WordRegister) -> u16 {
        let n = reg.index();
        if n < 4 {
            self.general[n].word()
        } else {
            self.pointers[n - 4]
        }
    }

    pub fn set_word(&mut self, reg: WordRegister, value: u16) {
        let n = reg.index();
        if n < 4 {
            self.general[n].set_word(value);
        } else {
            self.pointers[n - 4] = value;
        }
    }

    #[must_use]
    pub fn byte(&self, reg: ByteRegister) -> u8 {
        let (container, high) = reg.container();
        let r = &self.general[container.index()];
        if high {
            r.high()
        } else {
            r.low()
        }
    }

    pub fn set_byte(&mut self, reg: ByteRegister, value: u8) {
        let (container, high) = reg.container();
        let r = &mut self.general[container.index()];
        if high {
            r.set_high(value);
        } else {
            r.set_low(value);
        }
    }

    #[must_use]
    pub fn read(&self, reg: Register) -> u16 {
        match reg {
            Register::Byte(b) => u16::from(self.byte(b)),
            Register::Word(w) => self.word(w),
        }
    }

    /// Writes `value`, truncated to the width of `reg`.
    pub fn write(&mut self, reg: Register, value: u16) {
        match reg {
            Register::Byte(b) => self.set_byte(b, (value & 0xFF) as u8),
            Register::Word(w) => self.set_word(w, value),
        }
    }

    #[must_use]
    pub fn segment(&self, reg: SegmentRegister) -> u16 {
        self.segments[reg.index()]
    }

    pub fn set_segment(&mut self, reg: SegmentRegister, value: u16) {
        self.segments[reg.index()] = value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub name: &'static str,
    pub value: u32,
}

/// A copy of the architecturally visible registers, taken between
/// instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterSnapshot {
    pub architecture: &'static str,
    /// The linear address of the next instruction.
    pub program_counter: u32,
    pub registers: Vec<NamedValue>,
    pub flags: String,
}

impl RegisterSnapshot {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u32> {
        self.registers
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value)
    }
}

impl Display for RegisterSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        for (i, r) in self.registers.iter().enumerate() {
            if i > 0 {
                f.write_str(if i % 8 == 0 { "\n" } else { " " })?;
            }
            if r.value > 0xFFFF {
                write!(f, "{}={:08X}", r.name, r.value)?;
            } else {
                write!(f, "{}={:04X}", r.name, r.value)?;
            }
        }
        write!(f, "\nflags={}", self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_byte_halves_alias_word() {
        let mut regs = RegisterFile::new();
        regs.set_word(WordRegister::AX, 0x1234);
        assert_eq!(regs.byte(ByteRegister::AH), 0x12);
        assert_eq!(regs.byte(ByteRegister::AL), 0x34);
        regs.set_byte(ByteRegister::AH, 0xAB);
        assert_eq!(regs.word(WordRegister::AX), 0xAB34);
        regs.set_byte(ByteRegister::BL, 0xFF);
        assert_eq!(regs.word(WordRegister::BX), 0x00FF);
        assert_eq!(regs.word(WordRegister::AX), 0xAB34);
    }

    #[test]
    fn test_pointer_registers_are_separate() {
        let mut regs = RegisterFile::new();
        regs.set_word(WordRegister::SP, 0xFFFE);
        regs.set_word(WordRegister::DI, 0x0010);
        assert_eq!(regs.word(WordRegister::SP), 0xFFFE);
        assert_eq!(regs.word(WordRegister::BP), 0);
        assert_eq!(regs.word(WordRegister::DI), 0x0010);
    }

    #[test]
    fn test_write_truncates_to_register_width() {
        let mut regs = RegisterFile::new();
        regs.write(Register::Byte(ByteRegister::CL), 0x1FF);
        assert_eq!(regs.word(WordRegister::CX), 0x00FF);
    }

    #[proptest]
    fn halves_and_whole_agree(word: u16, low: u8, high: u8) {
        let mut r = DividableRegister::new(word);
        assert_eq!(u16::from(r.high()) << 8 | u16::from(r.low()), r.word());
        r.set_low(low);
        assert_eq!(r.high(), (word >> 8) as u8);
        r.set_high(high);
        assert_eq!(r.low(), low);
        assert_eq!(r.word(), u16::from(high) << 8 | u16::from(low));
    }
}
