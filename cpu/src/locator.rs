//! Segmented (real mode) memory addressing.

/// Real mode addresses are 20 bits wide; carries out of bit 19 are
/// lost.
pub const ADDRESS_MASK: u32 = 0xF_FFFF;

/// Computes the linear address of `base:offset`.
///
/// # Examples
/// ```
/// use cpu::get_address;
/// assert_eq!(get_address(0xF000, 0xFFF0), 0xFFFF0);
/// assert_eq!(get_address(0xFFFF, 0x0010), 0x00000);
/// ```
#[must_use]
pub const fn get_address(base: u16, offset: u16) -> u32 {
    ((base as u32) << 4).wrapping_add(offset as u32) & ADDRESS_MASK
}

/// A segment and an offset within it, such as SS:SP or ES:DI.  The
/// offset wraps within the 64KiB segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryLocator {
    pub base: u16,
    pub offset: u16,
}

impl MemoryLocator {
    #[must_use]
    pub const fn new(base: u16, offset: u16) -> MemoryLocator {
        MemoryLocator { base, offset }
    }

    #[must_use]
    pub const fn address(&self) -> u32 {
        get_address(self.base, self.offset)
    }

    pub fn increment(&mut self, delta: u16) {
        self.offset = self.offset.wrapping_add(delta);
    }

    pub fn decrement(&mut self, delta: u16) {
        self.offset = self.offset.wrapping_sub(delta);
    }

    /// A locator `delta` bytes further on, leaving this one alone.
    #[must_use]
    pub const fn offset_by(&self, delta: u16) -> MemoryLocator {
        MemoryLocator {
            base: self.base,
            offset: self.offset.wrapping_add(delta),
        }
    }
}

/// Where instruction bytes come from.  Real mode code wraps within
/// its code segment; a flat address space wraps at 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeAddress {
    Flat(u32),
    Segmented(MemoryLocator),
}

impl Default for CodeAddress {
    fn default() -> CodeAddress {
        CodeAddress::Flat(0)
    }
}

impl CodeAddress {
    #[must_use]
    pub const fn address(&self) -> u32 {
        match self {
            CodeAddress::Flat(address) => *address,
            CodeAddress::Segmented(locator) => locator.address(),
        }
    }

    /// The code address `delta` bytes further on.
    #[must_use]
    pub fn offset_by(&self, delta: usize) -> CodeAddress {
        match self {
            CodeAddress::Flat(address) => {
                let delta = u32::try_from(delta & 0xFFFF_FFFF).unwrap_or(u32::MAX);
                CodeAddress::Flat(address.wrapping_add(delta))
            }
            CodeAddress::Segmented(locator) => {
                let delta = u16::try_from(delta & 0xFFFF).unwrap_or(u16::MAX);
                CodeAddress::Segmented(locator.offset_by(delta))
            }
        }
    }
}
