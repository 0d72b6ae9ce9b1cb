use test_strategy::proptest;

use super::*;

fn width_of(word: bool) -> Width {
    if word {
        Width::Word
    } else {
        Width::Byte
    }
}

fn flags_after<F: FnOnce(&mut Flags) -> u16>(f: F) -> (u16, Flags) {
    let mut flags = Flags::new();
    let result = f(&mut flags);
    (result, flags)
}

#[test]
fn test_add_byte_wraps_to_zero() {
    let (result, flags) = flags_after(|f| add(f, Width::Byte, 0xFF, 0x01));
    assert_eq!(result, 0x00);
    assert!(flags.get(Flag::Carry));
    assert!(flags.get(Flag::Zero));
    assert!(flags.get(Flag::AuxiliaryCarry));
    assert!(flags.get(Flag::Parity));
    assert!(!flags.get(Flag::Overflow));
    assert!(!flags.get(Flag::Sign));
}

#[test]
fn test_add_word_signed_overflow() {
    let (result, flags) = flags_after(|f| add(f, Width::Word, 0x7FFF, 0x0001));
    assert_eq!(result, 0x8000);
    assert!(flags.get(Flag::Overflow));
    assert!(flags.get(Flag::Sign));
    assert!(!flags.get(Flag::Carry));
    assert!(!flags.get(Flag::Zero));
}

#[test]
fn test_adc_and_sbb_fold_in_carry() {
    let mut flags = Flags::new();
    flags.set(Flag::Carry, true);
    assert_eq!(adc(&mut flags, Width::Byte, 0x10, 0x20), 0x31);
    assert!(!flags.get(Flag::Carry));
    flags.set(Flag::Carry, true);
    assert_eq!(sbb(&mut flags, Width::Byte, 0x10, 0x10), 0xFF);
    assert!(flags.get(Flag::Carry));
    assert!(flags.get(Flag::Sign));
}

#[test]
fn test_sub_borrow() {
    let (result, flags) = flags_after(|f| sub(f, Width::Word, 0x0000, 0x0001));
    assert_eq!(result, 0xFFFF);
    assert!(flags.get(Flag::Carry));
    assert!(flags.get(Flag::AuxiliaryCarry));
    assert!(!flags.get(Flag::Overflow));
    let (result, flags) = flags_after(|f| sub(f, Width::Byte, 0x80, 0x01));
    assert_eq!(result, 0x7F);
    assert!(flags.get(Flag::Overflow));
}

#[test]
fn test_inc_dec_preserve_carry() {
    let mut flags = Flags::new();
    flags.set(Flag::Carry, true);
    assert_eq!(inc(&mut flags, Width::Byte, 0xFF), 0x00);
    assert!(flags.get(Flag::Carry));
    assert!(flags.get(Flag::Zero));
    flags.set(Flag::Carry, false);
    assert_eq!(dec(&mut flags, Width::Word, 0x0000), 0xFFFF);
    assert!(!flags.get(Flag::Carry));
    assert!(flags.get(Flag::Sign));
}

#[test]
fn test_logical_ops_clear_carry_and_overflow() {
    let mut flags = Flags::new();
    flags.set(Flag::Carry, true);
    flags.set(Flag::Overflow, true);
    assert_eq!(xor(&mut flags, Width::Word, 0x1234, 0x1234), 0);
    assert!(!flags.get(Flag::Carry));
    assert!(!flags.get(Flag::Overflow));
    assert!(flags.get(Flag::Zero));
    assert_eq!(or(&mut flags, Width::Byte, 0x80, 0x01), 0x81);
    assert!(flags.get(Flag::Sign));
    test(&mut flags, Width::Byte, 0x0F, 0xF0);
    assert!(flags.get(Flag::Zero));
}

#[test]
fn test_neg() {
    let (result, flags) = flags_after(|f| neg(f, Width::Byte, 0x01));
    assert_eq!(result, 0xFF);
    assert!(flags.get(Flag::Carry));
    let (result, flags) = flags_after(|f| neg(f, Width::Byte, 0x00));
    assert_eq!(result, 0x00);
    assert!(!flags.get(Flag::Carry));
    let (result, flags) = flags_after(|f| neg(f, Width::Byte, 0x80));
    assert_eq!(result, 0x80);
    assert!(flags.get(Flag::Overflow));
    assert_eq!(not(Width::Byte, 0x0F), 0xF0);
}

#[test]
fn test_shifts_and_rotates() {
    let mut flags = Flags::new();
    assert_eq!(shift(&mut flags, ShiftOp::Shl, Width::Byte, 0x81, 1), 0x02);
    assert!(flags.get(Flag::Carry));
    assert!(flags.get(Flag::Overflow));
    assert_eq!(shift(&mut flags, ShiftOp::Shr, Width::Byte, 0x81, 1), 0x40);
    assert!(flags.get(Flag::Carry));
    assert!(flags.get(Flag::Overflow));
    assert_eq!(shift(&mut flags, ShiftOp::Sar, Width::Byte, 0x81, 1), 0xC0);
    assert!(!flags.get(Flag::Overflow));
    assert_eq!(shift(&mut flags, ShiftOp::Rol, Width::Word, 0x8001, 4), 0x0018);
    assert!(!flags.get(Flag::Carry));
    assert_eq!(shift(&mut flags, ShiftOp::Ror, Width::Byte, 0x01, 1), 0x80);
    assert!(flags.get(Flag::Carry));
    flags.set(Flag::Carry, true);
    assert_eq!(shift(&mut flags, ShiftOp::Rcl, Width::Byte, 0x00, 1), 0x01);
    assert!(!flags.get(Flag::Carry));
    flags.set(Flag::Carry, true);
    assert_eq!(shift(&mut flags, ShiftOp::Rcr, Width::Byte, 0x00, 1), 0x80);
    assert!(!flags.get(Flag::Carry));
}

#[test]
fn test_shift_by_zero_changes_nothing() {
    let mut flags = Flags::new();
    flags.set(Flag::Carry, true);
    let before = flags;
    assert_eq!(shift(&mut flags, ShiftOp::Shl, Width::Word, 0x1234, 0), 0x1234);
    assert_eq!(flags, before);
}

#[test]
fn test_multiply() {
    let mut flags = Flags::new();
    assert_eq!(multiply(&mut flags, Width::Byte, false, 0x10, 0x10), 0x0100);
    assert!(flags.get(Flag::Carry));
    assert_eq!(multiply(&mut flags, Width::Byte, false, 0x02, 0x03), 0x0006);
    assert!(!flags.get(Flag::Carry));
    // -1 * -1 = 1 fits in a byte.
    assert_eq!(multiply(&mut flags, Width::Byte, true, 0xFF, 0xFF), 0x0001);
    assert!(!flags.get(Flag::Overflow));
    // -2 * 3 = -6 sign-extends into AH.
    assert_eq!(multiply(&mut flags, Width::Byte, true, 0xFE, 0x03), 0xFFFA);
    assert!(!flags.get(Flag::Overflow));
    assert_eq!(
        multiply(&mut flags, Width::Word, false, 0xFFFF, 0xFFFF),
        0xFFFE_0001
    );
}

#[test]
fn test_divide() {
    assert_eq!(divide(Width::Byte, false, 0x0107, 0x10), Ok((0x10, 0x07)));
    assert_eq!(divide(Width::Byte, false, 0x1000, 0x10), Err(DivideOverflow));
    assert_eq!(divide(Width::Word, false, 1, 0), Err(DivideOverflow));
    // -7 / 2 = -3 remainder -1
    assert_eq!(
        divide(Width::Word, true, 0xFFFF_FFF9, 2),
        Ok((0xFFFD, 0xFFFF))
    );
    // -128 is not a valid quotient on the 8086.
    assert_eq!(divide(Width::Byte, true, 0xFF00, 0x02), Err(DivideOverflow));
}

#[test]
fn test_bcd_adjust() {
    let mut flags = Flags::new();
    // 0x19 + 0x28 = 0x41 with AF; DAA gives 0x47.
    let sum = add(&mut flags, Width::Byte, 0x19, 0x28) as u8;
    assert_eq!(daa(&mut flags, sum), 0x47);
    assert!(!flags.get(Flag::Carry));
    // 0x47 - 0x19 = 0x2E; DAS gives 0x28.
    let difference = sub(&mut flags, Width::Byte, 0x47, 0x19) as u8;
    assert_eq!(das(&mut flags, difference), 0x28);
    // '9' + '5' in AL = 0x6E; AAA gives AX = 0x0104.
    let mut flags = Flags::new();
    assert_eq!(aaa(&mut flags, 0x006E), 0x0104);
    assert!(flags.get(Flag::Carry));
    assert_eq!(aas(&mut flags, 0x01FF), 0x0009);
    assert_eq!(aam(&mut flags, 63, 10), Ok(0x0603));
    assert_eq!(aam(&mut flags, 63, 0), Err(DivideOverflow));
    assert_eq!(aad(&mut flags, 0x0603, 10), 63);
}

#[test]
fn test_parity_table() {
    assert!(PARITY[0]);
    assert!(!PARITY[1]);
    assert!(PARITY[3]);
    assert!(PARITY[0xFF]);
}

#[proptest]
fn add_then_sub_is_identity(word: bool, a: u16, b: u16) {
    let width = width_of(word);
    let mut flags = Flags::new();
    let sum = add(&mut flags, width, a, b);
    assert_eq!(sub(&mut flags, width, sum, b), a & width.mask());
}

#[proptest]
fn add_flags_match_wide_oracle(word: bool, a: u16, b: u16) {
    let width = width_of(word);
    let mut flags = Flags::new();
    let result = add(&mut flags, width, a, b);
    let (a, b) = (a & width.mask(), b & width.mask());
    let unsigned = i64::from(a) + i64::from(b);
    let signed = i64::from(width.to_signed(a)) + i64::from(width.to_signed(b));
    let max = i64::from(width.mask());
    let smax = i64::from(width.sign_bit()) - 1;
    assert_eq!(i64::from(result), unsigned & max);
    assert_eq!(flags.get(Flag::Carry), unsigned > max);
    assert_eq!(flags.get(Flag::Overflow), signed > smax || signed < -smax - 1);
    assert_eq!(flags.get(Flag::Zero), result == 0);
    assert_eq!(flags.get(Flag::Sign), width.is_negative(result));
    assert_eq!(
        flags.get(Flag::Parity),
        (result & 0xFF).count_ones() % 2 == 0
    );
}

#[proptest]
fn sub_flags_match_wide_oracle(word: bool, a: u16, b: u16) {
    let width = width_of(word);
    let mut flags = Flags::new();
    let result = sub(&mut flags, width, a, b);
    let (a, b) = (a & width.mask(), b & width.mask());
    let signed = i64::from(width.to_signed(a)) - i64::from(width.to_signed(b));
    let smax = i64::from(width.sign_bit()) - 1;
    assert_eq!(flags.get(Flag::Carry), b > a);
    assert_eq!(flags.get(Flag::Overflow), signed > smax || signed < -smax - 1);
    assert_eq!(flags.get(Flag::AuxiliaryCarry), (a & 0xF) < (b & 0xF));
    assert_eq!(result, a.wrapping_sub(b) & width.mask());
}

#[proptest]
fn unsigned_divide_inverts_multiply(a: u8, b: u8) {
    let mut flags = Flags::new();
    if b != 0 {
        let product = multiply(&mut flags, Width::Byte, false, u16::from(a), u16::from(b));
        let (q, r) = divide(Width::Byte, false, product, u16::from(b)).expect("quotient fits");
        assert_eq!(q, u16::from(a));
        assert_eq!(r, 0);
    }
}
