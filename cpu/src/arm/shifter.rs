//! The barrel shifter and the adder, which between them produce the
//! result and NZCV flags of data-processing instructions.
use base::arm::ShiftKind;

/// Shifts `value` by `amount`, returning the result and the shifter
/// carry-out.  Amounts of 32 or more are meaningful for
/// register-specified shifts.
fn shift_by(kind: ShiftKind, value: u32, amount: u32, carry: bool) -> (u32, bool) {
    if amount == 0 {
        return (value, carry);
    }
    let bit = |n: u32| (value >> n) & 1 != 0;
    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => (value << amount, bit(32 - amount)),
            32 => (0, bit(0)),
            _ => (0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => (value >> amount, bit(amount - 1)),
            32 => (0, bit(31)),
            _ => (0, false),
        },
        ShiftKind::Asr => {
            if amount < 32 {
                (((value as i32) >> amount) as u32, bit(amount - 1))
            } else if bit(31) {
                (u32::MAX, true)
            } else {
                (0, false)
            }
        }
        ShiftKind::Ror => match amount & 31 {
            0 => (value, bit(31)),
            r => (value.rotate_right(r), bit(r - 1)),
        },
    }
}

/// A shift by an amount encoded in the instruction.  An encoded
/// amount of zero means LSL #0 (no shift), LSR #32, ASR #32 or RRX.
pub(crate) fn shift_immediate(
    kind: ShiftKind,
    value: u32,
    amount: u32,
    carry: bool,
) -> (u32, bool) {
    match (kind, amount) {
        (ShiftKind::Lsl, 0) => (value, carry),
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => shift_by(kind, value, 32, carry),
        (ShiftKind::Ror, 0) => ((u32::from(carry) << 31) | (value >> 1), value & 1 != 0),
        _ => shift_by(kind, value, amount, carry),
    }
}

/// A shift by the bottom byte of a register.  A zero amount leaves
/// both the value and the carry flag alone.
pub(crate) fn shift_register(kind: ShiftKind, value: u32, amount: u32, carry: bool) -> (u32, bool) {
    shift_by(kind, value, amount & 0xFF, carry)
}

/// Computes `a + b + carry`, returning the result, the carry out and
/// the signed overflow.  Subtraction is `a + !b + 1`.
pub(crate) fn add_with_carry(a: u32, b: u32, carry: bool) -> (u32, bool, bool) {
    let unsigned = u64::from(a) + u64::from(b) + u64::from(carry);
    let signed = i64::from(a as i32) + i64::from(b as i32) + i64::from(carry);
    let result = unsigned as u32;
    (
        result,
        unsigned > u64::from(u32::MAX),
        signed != i64::from(result as i32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_immediate_zero_encodings() {
        assert_eq!(shift_immediate(ShiftKind::Lsl, 0x8000_0001, 0, true), (0x8000_0001, true));
        assert_eq!(shift_immediate(ShiftKind::Lsr, 0x8000_0000, 0, false), (0, true));
        assert_eq!(
            shift_immediate(ShiftKind::Asr, 0x8000_0000, 0, false),
            (0xFFFF_FFFF, true)
        );
        // RRX
        assert_eq!(shift_immediate(ShiftKind::Ror, 0x0000_0003, 0, true), (0x8000_0001, true));
    }

    #[test]
    fn test_register_shift_amounts() {
        assert_eq!(shift_register(ShiftKind::Lsl, 1, 0, true), (1, true));
        assert_eq!(shift_register(ShiftKind::Lsl, 1, 32, false), (0, true));
        assert_eq!(shift_register(ShiftKind::Lsl, 1, 33, true), (0, false));
        assert_eq!(shift_register(ShiftKind::Lsr, 0x8000_0000, 32, false), (0, true));
        assert_eq!(shift_register(ShiftKind::Ror, 0x8000_0000, 32, false), (0x8000_0000, true));
        assert_eq!(shift_register(ShiftKind::Ror, 0x0000_0001, 1, false), (0x8000_0000, true));
        // Only the bottom byte of the register counts.
        assert_eq!(shift_register(ShiftKind::Lsl, 1, 0x101, false), (2, false));
    }

    #[test]
    fn test_add_with_carry_flags() {
        assert_eq!(add_with_carry(0xFFFF_FFFF, 1, false), (0, true, false));
        assert_eq!(add_with_carry(0x7FFF_FFFF, 1, false), (0x8000_0000, false, true));
        // 5 - 3 as 5 + !3 + 1: no borrow, so carry is set.
        assert_eq!(add_with_carry(5, !3, true), (2, true, false));
        // 3 - 5 borrows.
        assert_eq!(add_with_carry(3, !5, true), (0xFFFF_FFFE, false, false));
    }

    #[proptest]
    fn lsl_matches_wide_shift(value: u32, amount: u8) {
        let amount = u32::from(amount % 31) + 1;
        let wide = u64::from(value) << amount;
        let (result, carry) = shift_register(ShiftKind::Lsl, value, amount, false);
        assert_eq!(result, wide as u32);
        assert_eq!(carry, (wide >> 32) & 1 != 0);
    }

    #[proptest]
    fn subtraction_carry_is_not_borrow(a: u32, b: u32) {
        let (result, carry, _) = add_with_carry(a, !b, true);
        assert_eq!(result, a.wrapping_sub(b));
        assert_eq!(carry, a >= b);
    }
}
