//! Instruction prefixes.
use serde::Serialize;

use crate::instruction::DecodeFailure;
use crate::source::Cursor;

use super::registers::SegmentRegister;

/// Prefix bytes beyond this many are not treated as prefixes (the
/// byte is then taken to be the opcode, which will be unrecognised).
pub const MAX_PREFIXES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Repeat {
    /// F3: REP, or REPE/REPZ for CMPS and SCAS.
    Equal,
    /// F2: REPNE/REPNZ.
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Prefixes {
    pub segment: Option<SegmentRegister>,
    pub repeat: Option<Repeat>,
    pub lock: bool,
    /// Total number of prefix bytes.
    pub count: u8,
}

enum Prefix {
    Segment(SegmentRegister),
    Repeat(Repeat),
    Lock,
}

fn classify(b: u8) -> Option<Prefix> {
    match b {
        0x26 => Some(Prefix::Segment(SegmentRegister::ES)),
        0x2E => Some(Prefix::Segment(SegmentRegister::CS)),
        0x36 => Some(Prefix::Segment(SegmentRegister::SS)),
        0x3E => Some(Prefix::Segment(SegmentRegister::DS)),
        0xF0 => Some(Prefix::Lock),
        0xF2 => Some(Prefix::Repeat(Repeat::NotEqual)),
        0xF3 => Some(Prefix::Repeat(Repeat::Equal)),
        _ => None,
    }
}

#[must_use]
pub fn is_prefix(b: u8) -> bool {
    classify(b).is_some()
}

/// Consumes the prefix bytes at the cursor.  When more than one
/// prefix of the same kind is present, the last one takes effect.
pub(crate) fn strip_prefixes(cursor: &mut Cursor) -> Result<Prefixes, DecodeFailure> {
    let mut result = Prefixes::default();
    while usize::from(result.count) < MAX_PREFIXES {
        let Some(prefix) = classify(cursor.peek()?) else {
            break;
        };
        cursor.next_byte()?;
        result.count += 1;
        match prefix {
            Prefix::Segment(seg) => result.segment = Some(seg),
            Prefix::Repeat(rep) => result.repeat = Some(rep),
            Prefix::Lock => result.lock = true,
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(bytes: &[u8]) -> (Prefixes, usize) {
        let mut source: &[u8] = bytes;
        let mut cursor = Cursor::new(&mut source, 0);
        let prefixes = strip_prefixes(&mut cursor).expect("test data should not be truncated");
        (prefixes, cursor.consumed())
    }

    #[test]
    fn test_no_prefix() {
        assert_eq!(strip(&[0x90]), (Prefixes::default(), 0));
    }

    #[test]
    fn test_last_segment_override_wins() {
        let (p, n) = strip(&[0x2E, 0x26, 0x04, 0x05]);
        assert_eq!(n, 2);
        assert_eq!(p.segment, Some(SegmentRegister::ES));
        assert_eq!(p.count, 2);
    }

    #[test]
    fn test_rep_and_lock() {
        let (p, n) = strip(&[0xF0, 0xF3, 0xA4]);
        assert_eq!(n, 2);
        assert!(p.lock);
        assert_eq!(p.repeat, Some(Repeat::Equal));
    }

    #[test]
    fn test_at_most_four_prefixes() {
        let (p, n) = strip(&[0x26, 0x26, 0x26, 0x26, 0x26, 0x90]);
        assert_eq!(n, MAX_PREFIXES);
        assert_eq!(usize::from(p.count), MAX_PREFIXES);
    }
}
