//! The memory unit: a flat, little-endian byte array.
//!
//! Addresses at or above the start of ROM are read-only for the
//! running program (writes are dropped) but can be loaded with
//! [`MemoryUnit::load_image`] before execution starts.  Addresses
//! beyond the populated size read as all-ones and ignore writes.
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

use tracing::{event, Level};

use base::width::Width;

/// The byte an unpopulated address reads as.
pub const UNPOPULATED: u8 = 0xFF;

/// The lowest ROM address in the default configuration.
pub const DEFAULT_ROM_START: u32 = 0xF6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfiguration {
    /// The number of populated bytes, starting at address 0.
    pub size: usize,
    /// Writes at or above this address are dropped.
    pub rom_start: Option<u32>,
}

impl Default for MemoryConfiguration {
    fn default() -> MemoryConfiguration {
        MemoryConfiguration {
            size: 0x10_0000,
            rom_start: Some(DEFAULT_ROM_START),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOpFailure {
    /// An image loaded at `base` would extend past the end of
    /// populated memory.
    ImageTooLarge {
        base: u32,
        length: usize,
        size: usize,
    },
}

impl Display for MemoryOpFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            MemoryOpFailure::ImageTooLarge { base, length, size } => write!(
                f,
                "an image of {length} bytes loaded at {base:#07X} does not fit in {size} bytes of memory"
            ),
        }
    }
}

impl Error for MemoryOpFailure {}

pub struct MemoryUnit {
    bytes: Vec<u8>,
    rom_start: Option<u32>,
}

impl Debug for MemoryUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("MemoryUnit")
            .field("size", &self.bytes.len())
            .field("rom_start", &self.rom_start)
            .finish()
    }
}

impl MemoryUnit {
    pub fn new(config: &MemoryConfiguration) -> MemoryUnit {
        MemoryUnit {
            bytes: vec![0; config.size],
            rom_start: config.rom_start,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    fn index(&self, address: u32) -> Option<usize> {
        usize::try_from(address)
            .ok()
            .filter(|&i| i < self.bytes.len())
    }

    #[must_use]
    pub fn is_rom(&self, address: u32) -> bool {
        matches!(self.rom_start, Some(start) if address >= start)
    }

    /// Reads a byte for instruction fetch.  Unlike [`read_byte`],
    /// this reports the end of populated memory, so that execution
    /// which runs off the end can be detected.
    ///
    /// [`read_byte`]: MemoryUnit::read_byte
    #[must_use]
    pub fn fetch_byte(&self, address: u32) -> Option<u8> {
        self.index(address).map(|i| self.bytes[i])
    }

    #[must_use]
    pub fn read_byte(&self, address: u32) -> u8 {
        self.fetch_byte(address).unwrap_or(UNPOPULATED)
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        if self.is_rom(address) {
            event!(
                Level::TRACE,
                "dropping write of {value:#04X} to ROM address {address:#07X}"
            );
            return;
        }
        match self.index(address) {
            Some(i) => {
                self.bytes[i] = value;
            }
            None => {
                event!(
                    Level::TRACE,
                    "dropping write of {value:#04X} to unpopulated address {address:#07X}"
                );
            }
        }
    }

    /// Reads a little-endian value of width `width`.
    #[must_use]
    pub fn get_mem(&self, width: Width, address: u32) -> u16 {
        let lo = u16::from(self.read_byte(address));
        match width {
            Width::Byte => lo,
            Width::Word => lo | (u16::from(self.read_byte(address.wrapping_add(1))) << 8),
        }
    }

    /// Writes `value`, truncated to `width`, in little-endian order.
    pub fn set_mem(&mut self, width: Width, address: u32, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(address, lo);
        if width == Width::Word {
            self.write_byte(address.wrapping_add(1), hi);
        }
    }

    #[must_use]
    pub fn read_u32(&self, address: u32) -> u32 {
        let lo = self.get_mem(Width::Word, address);
        let hi = self.get_mem(Width::Word, address.wrapping_add(2));
        u32::from(lo) | (u32::from(hi) << 16)
    }

    pub fn write_u32(&mut self, address: u32, value: u32) {
        for (i, b) in (0u32..).zip(value.to_le_bytes()) {
            self.write_byte(address.wrapping_add(i), b);
        }
    }

    /// Copies `image` into memory at `base`, ignoring write
    /// protection.  This is how ROM contents get there.
    pub fn load_image(&mut self, base: u32, image: &[u8]) -> Result<(), MemoryOpFailure> {
        let size = self.bytes.len();
        let too_large = || MemoryOpFailure::ImageTooLarge {
            base,
            length: image.len(),
            size,
        };
        let start = usize::try_from(base).map_err(|_| too_large())?;
        let end = start.checked_add(image.len()).ok_or_else(too_large)?;
        match self.bytes.get_mut(start..end) {
            Some(destination) => {
                destination.copy_from_slice(image);
                event!(
                    Level::INFO,
                    "loaded {} bytes at {base:#07X}",
                    image.len()
                );
                Ok(())
            }
            None => Err(too_large()),
        }
    }
}
