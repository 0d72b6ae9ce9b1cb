//! Byte streams from which instructions are decoded.
use crate::instruction::DecodeFailure;

/// Something instruction bytes can be read from.  The emulator
/// implements this over its prefetch queue and memory; tools
/// (and tests) can simply use a byte slice.
pub trait ByteSource {
    /// Returns the byte at `index`, or `None` when the stream ends
    /// before reaching it.
    fn byte_at(&mut self, index: usize) -> Option<u8>;
}

impl ByteSource for &[u8] {
    fn byte_at(&mut self, index: usize) -> Option<u8> {
        self.get(index).copied()
    }
}

impl ByteSource for Vec<u8> {
    fn byte_at(&mut self, index: usize) -> Option<u8> {
        self.get(index).copied()
    }
}

/// Reads consecutive bytes from a [`ByteSource`], remembering where
/// the current instruction started so that its length can be
/// computed once it has been parsed.
pub struct Cursor<'a> {
    source: &'a mut dyn ByteSource,
    start: usize,
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a mut dyn ByteSource, start: usize) -> Cursor<'a> {
        Cursor {
            source,
            start,
            position: start,
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes consumed since the cursor was created.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.position - self.start
    }

    pub fn peek(&mut self) -> Result<u8, DecodeFailure> {
        self.source
            .byte_at(self.position)
            .ok_or(DecodeFailure::EndOfStream {
                position: self.position,
            })
    }

    pub fn next_byte(&mut self) -> Result<u8, DecodeFailure> {
        let b = self.peek()?;
        self.position += 1;
        Ok(b)
    }

    /// Reads a little-endian 16-bit value.
    pub fn next_word(&mut self) -> Result<u16, DecodeFailure> {
        let lo = self.next_byte()?;
        let hi = self.next_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Reads a little-endian 32-bit value.
    pub fn next_u32(&mut self) -> Result<u32, DecodeFailure> {
        let lo = self.next_word()?;
        let hi = self.next_word()?;
        Ok(u32::from(lo) | (u32::from(hi) << 16))
    }
}
