//! Utilities for pulling fixed-position fields out of instruction
//! words, and for matching fields against documented bit patterns.

/// Extracts bits `high..=low` of `word`, shifted down to bit 0.
///
/// # Examples
/// ```
/// use base::bitfield::field;
/// assert_eq!(field(0xE3A0_1005, 31, 28), 0xE);
/// assert_eq!(field(0xE3A0_1005, 15, 12), 0x1);
/// ```
#[must_use]
pub const fn field(word: u32, high: u32, low: u32) -> u32 {
    let width = high - low + 1;
    let mask = ((1_u64 << width) - 1) as u32;
    (word >> low) & mask
}

#[must_use]
pub const fn bit(word: u32, n: u32) -> bool {
    (word >> n) & 1 != 0
}

/// Sign-extends the low `bits` bits of `value`.
#[must_use]
pub const fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Sign-extends an 8-bit displacement or immediate to 16 bits.
#[must_use]
pub const fn sign_extend_byte(value: u8) -> u16 {
    value as i8 as i16 as u16
}

/// A pattern such as `10xx0` against which an instruction field is
/// compared.  A `0` or `1` constrains the bit in that position, an
/// `x` leaves it unconstrained.  Underscores may be used as
/// separators and are ignored.  The rightmost character describes
/// bit 0 of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitPattern {
    mask: u32,
    value: u32,
}

impl BitPattern {
    /// Parses a pattern.  Being `const`, an invalid pattern is a
    /// compile-time error when used to initialise a constant.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` contains a character other than `0`, `1`,
    /// `x` or `_`, or describes more than 32 bits.
    #[must_use]
    pub const fn new(pattern: &str) -> BitPattern {
        let bytes = pattern.as_bytes();
        let mut mask: u32 = 0;
        let mut value: u32 = 0;
        let mut bits = 0;
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            i += 1;
            if c == b'_' {
                continue;
            }
            bits += 1;
            assert!(bits <= 32, "bit patterns may describe at most 32 bits");
            mask <<= 1;
            value <<= 1;
            match c {
                b'0' => {
                    mask |= 1;
                }
                b'1' => {
                    mask |= 1;
                    value |= 1;
                }
                b'x' => (),
                _ => panic!("bit patterns may only contain 0, 1, x and _"),
            }
        }
        BitPattern { mask, value }
    }

    #[must_use]
    pub const fn matches(&self, field: u32) -> bool {
        field & self.mask == self.value
    }

    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_field() {
        assert_eq!(field(0b1011_0000, 7, 4), 0b1011);
        assert_eq!(field(0xFFFF_FFFF, 31, 0), 0xFFFF_FFFF);
        assert_eq!(field(0x8000_0000, 31, 31), 1);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x00FF_FFFF, 24), -1);
        assert_eq!(sign_extend(0x007F_FFFF, 24), 0x7F_FFFF);
        assert_eq!(sign_extend(0x0080_0000, 24), -0x80_0000);
        assert_eq!(sign_extend_byte(0x80), 0xFF80);
        assert_eq!(sign_extend_byte(0x7F), 0x007F);
    }

    #[test]
    fn test_pattern_with_dont_cares() {
        const P: BitPattern = BitPattern::new("10xx0");
        assert_eq!(P.mask(), 0b11001);
        assert_eq!(P.value(), 0b10000);
        for field in 0..32_u32 {
            let expected = field & 0b10000 != 0 && field & 0b01000 == 0 && field & 1 == 0;
            assert_eq!(P.matches(field), expected, "field {field:#07b}");
        }
    }

    #[test]
    fn test_pattern_of_32_bits() {
        let p = BitPattern::new("1xxx_xxxx_xxxx_xxxx_xxxx_xxxx_xxxx_xxx0");
        assert_eq!(p.mask(), 0x8000_0001);
        assert_eq!(p.value(), 0x8000_0000);
    }

    #[test]
    #[should_panic(expected = "at most 32 bits")]
    fn test_pattern_longer_than_a_word() {
        let _ = BitPattern::new("1_0000_0000_0000_0000_0000_0000_0000_0000");
    }

    #[test]
    #[should_panic(expected = "may only contain")]
    fn test_pattern_with_bad_character() {
        let _ = BitPattern::new("10y1");
    }

    #[test]
    fn test_pattern_separators() {
        assert_eq!(BitPattern::new("1_0x"), BitPattern::new("10x"));
    }

    #[proptest]
    fn all_dont_care_matches_everything(field: u32) {
        assert!(BitPattern::new("xxxxxxxx").matches(field));
    }

    #[proptest]
    fn exact_pattern_matches_only_itself(a: u8, b: u8) {
        let text = format!("{a:08b}");
        let pattern = BitPattern::new(&text);
        assert_eq!(pattern.matches(u32::from(b)), a == b);
    }
}
