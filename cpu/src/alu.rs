//! The 8086 arithmetic and logic unit.
//!
//! Every operation is a plain function of its operands and the width
//! at which it operates, updating the flags it is documented to
//! affect.  Operands are passed and returned as `u16`; for byte
//! operations only the low 8 bits are significant.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use base::prelude::*;
use base::x86::ShiftOp;

use crate::flags::{Flag, Flags};

const fn parity_table() -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() % 2 == 0;
        i += 1;
    }
    table
}

/// `PARITY[b]` is true when `b` has an even number of set bits.
static PARITY: [bool; 256] = parity_table();

/// Division by zero, or a quotient too large for its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivideOverflow;

impl Display for DivideOverflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str("divide error")
    }
}

impl Error for DivideOverflow {}

fn set_szp(flags: &mut Flags, width: Width, result: u16) {
    flags.set(Flag::Sign, width.is_negative(result));
    flags.set(Flag::Zero, result & width.mask() == 0);
    flags.set(Flag::Parity, PARITY[usize::from(result & 0xFF)]);
}

fn add_with_carry(flags: &mut Flags, width: Width, a: u16, b: u16, carry: bool) -> u16 {
    let a = a & width.mask();
    let b = b & width.mask();
    let wide = u32::from(a) + u32::from(b) + u32::from(carry);
    let result = width.truncate(wide);
    flags.set(Flag::Carry, wide > u32::from(width.mask()));
    flags.set(Flag::AuxiliaryCarry, (a ^ b ^ result) & 0x10 != 0);
    flags.set(
        Flag::Overflow,
        (a ^ result) & (b ^ result) & width.sign_bit() != 0,
    );
    set_szp(flags, width, result);
    result
}

fn sub_with_borrow(flags: &mut Flags, width: Width, a: u16, b: u16, borrow: bool) -> u16 {
    let a = a & width.mask();
    let b = b & width.mask();
    let wide = u32::from(a)
        .wrapping_sub(u32::from(b))
        .wrapping_sub(u32::from(borrow));
    let result = width.truncate(wide);
    flags.set(Flag::Carry, u32::from(b) + u32::from(borrow) > u32::from(a));
    flags.set(Flag::AuxiliaryCarry, (a ^ b ^ result) & 0x10 != 0);
    flags.set(
        Flag::Overflow,
        (a ^ b) & (a ^ result) & width.sign_bit() != 0,
    );
    set_szp(flags, width, result);
    result
}

pub fn add(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    add_with_carry(flags, width, a, b, false)
}

pub fn adc(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    let carry = flags.get(Flag::Carry);
    add_with_carry(flags, width, a, b, carry)
}

pub fn sub(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    sub_with_borrow(flags, width, a, b, false)
}

pub fn sbb(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    let borrow = flags.get(Flag::Carry);
    sub_with_borrow(flags, width, a, b, borrow)
}

/// Sets the flags as `sub` would, discarding the difference.
pub fn cmp(flags: &mut Flags, width: Width, a: u16, b: u16) {
    sub(flags, width, a, b);
}

/// INC leaves CF alone.
pub fn inc(flags: &mut Flags, width: Width, a: u16) -> u16 {
    let carry = flags.get(Flag::Carry);
    let result = add(flags, width, a, 1);
    flags.set(Flag::Carry, carry);
    result
}

/// DEC leaves CF alone.
pub fn dec(flags: &mut Flags, width: Width, a: u16) -> u16 {
    let carry = flags.get(Flag::Carry);
    let result = sub(flags, width, a, 1);
    flags.set(Flag::Carry, carry);
    result
}

pub fn neg(flags: &mut Flags, width: Width, a: u16) -> u16 {
    let result = sub(flags, width, 0, a);
    flags.set(Flag::Carry, a & width.mask() != 0);
    result
}

/// NOT affects no flags.
#[must_use]
pub fn not(width: Width, a: u16) -> u16 {
    !a & width.mask()
}

fn logical(flags: &mut Flags, width: Width, result: u16) -> u16 {
    let result = result & width.mask();
    flags.set(Flag::Carry, false);
    flags.set(Flag::Overflow, false);
    flags.set(Flag::AuxiliaryCarry, false);
    set_szp(flags, width, result);
    result
}

pub fn and(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    logical(flags, width, a & b)
}

pub fn or(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    logical(flags, width, a | b)
}

pub fn xor(flags: &mut Flags, width: Width, a: u16, b: u16) -> u16 {
    logical(flags, width, a ^ b)
}

/// Sets the flags as `and` would, discarding the result.
pub fn test(flags: &mut Flags, width: Width, a: u16, b: u16) {
    logical(flags, width, a & b);
}

/// Shifts or rotates `value` by `count` places.  A count of zero
/// changes neither the value nor the flags.  The 8086 does not mask
/// the count.
pub fn shift(flags: &mut Flags, op: ShiftOp, width: Width, value: u16, count: u8) -> u16 {
    let mask = width.mask();
    let sign = width.sign_bit();
    let top_shift = width.bits() - 1;
    let mut v = value & mask;
    if count == 0 {
        return v;
    }
    let mut carry = flags.get(Flag::Carry);
    for _ in 0..count {
        match op {
            ShiftOp::Rol => {
                carry = v & sign != 0;
                v = ((v << 1) | u16::from(carry)) & mask;
            }
            ShiftOp::Ror => {
                carry = v & 1 != 0;
                v = (v >> 1) | (u16::from(carry) << top_shift);
            }
            ShiftOp::Rcl => {
                let out = v & sign != 0;
                v = ((v << 1) | u16::from(carry)) & mask;
                carry = out;
            }
            ShiftOp::Rcr => {
                let out = v & 1 != 0;
                v = (v >> 1) | (u16::from(carry) << top_shift);
                carry = out;
            }
            ShiftOp::Shl => {
                carry = v & sign != 0;
                v = (v << 1) & mask;
            }
            ShiftOp::Shr => {
                carry = v & 1 != 0;
                v >>= 1;
            }
            ShiftOp::Sar => {
                carry = v & 1 != 0;
                v = (v >> 1) | (v & sign);
            }
        }
    }
    flags.set(Flag::Carry, carry);
    let msb = v & sign != 0;
    let overflow = match op {
        ShiftOp::Rol | ShiftOp::Rcl | ShiftOp::Shl => msb != carry,
        ShiftOp::Ror | ShiftOp::Rcr => msb != (v & (sign >> 1) != 0),
        ShiftOp::Shr => value & sign != 0 && count == 1,
        ShiftOp::Sar => false,
    };
    flags.set(Flag::Overflow, overflow);
    if matches!(op, ShiftOp::Shl | ShiftOp::Shr | ShiftOp::Sar) {
        flags.set(Flag::AuxiliaryCarry, false);
        set_szp(flags, width, v);
    }
    v
}

/// Multiplies two values of width `width`, returning the
/// double-width product (AX for byte operands, DX:AX for word
/// operands).  CF and OF are set when the upper half of the product
/// is significant.
pub fn multiply(flags: &mut Flags, width: Width, signed: bool, a: u16, b: u16) -> u32 {
    let bits = width.bits();
    let (product, significant) = if signed {
        let p = width.to_signed(a) * width.to_signed(b);
        let low = width.to_signed(width.truncate(p as u32));
        (p as u32, low != p)
    } else {
        let p = u32::from(a & width.mask()) * u32::from(b & width.mask());
        (p, p >> bits != 0)
    };
    let product = product & if bits == 8 { 0xFFFF } else { 0xFFFF_FFFF };
    flags.set(Flag::Carry, significant);
    flags.set(Flag::Overflow, significant);
    set_szp(flags, width, width.truncate(product));
    product
}

/// Divides the double-width `dividend` (AX or DX:AX) by `divisor`,
/// returning the quotient and remainder.
pub fn divide(
    width: Width,
    signed: bool,
    dividend: u32,
    divisor: u16,
) -> Result<(u16, u16), DivideOverflow> {
    let divisor = divisor & width.mask();
    if divisor == 0 {
        return Err(DivideOverflow);
    }
    if signed {
        let dividend = match width {
            Width::Byte => i64::from(dividend as u16 as i16),
            Width::Word => i64::from(dividend as i32),
        };
        let divisor = i64::from(width.to_signed(divisor));
        let quotient = dividend / divisor;
        let remainder = dividend % divisor;
        let limit = i64::from(width.sign_bit());
        // The 8086 treats the most negative quotient as an overflow.
        if quotient >= limit || quotient <= -limit {
            return Err(DivideOverflow);
        }
        Ok((
            width.truncate(quotient as u32),
            width.truncate(remainder as u32),
        ))
    } else {
        let quotient = dividend / u32::from(divisor);
        let remainder = dividend % u32::from(divisor);
        if quotient > u32::from(width.mask()) {
            return Err(DivideOverflow);
        }
        Ok((quotient as u16, remainder as u16))
    }
}

/// Decimal adjust AL after addition.
pub fn daa(flags: &mut Flags, al: u8) -> u8 {
    let old_al = al;
    let old_carry = flags.get(Flag::Carry);
    let mut al = al;
    if al & 0x0F > 9 || flags.get(Flag::AuxiliaryCarry) {
        al = al.wrapping_add(6);
        flags.set(Flag::AuxiliaryCarry, true);
    } else {
        flags.set(Flag::AuxiliaryCarry, false);
    }
    if old_al > 0x99 || old_carry {
        al = al.wrapping_add(0x60);
        flags.set(Flag::Carry, true);
    } else {
        flags.set(Flag::Carry, false);
    }
    set_szp(flags, Width::Byte, u16::from(al));
    al
}

/// Decimal adjust AL after subtraction.
pub fn das(flags: &mut Flags, al: u8) -> u8 {
    let old_al = al;
    let old_carry = flags.get(Flag::Carry);
    let mut al = al;
    if al & 0x0F > 9 || flags.get(Flag::AuxiliaryCarry) {
        al = al.wrapping_sub(6);
        flags.set(Flag::AuxiliaryCarry, true);
    } else {
        flags.set(Flag::AuxiliaryCarry, false);
    }
    if old_al > 0x99 || old_carry {
        al = al.wrapping_sub(0x60);
        flags.set(Flag::Carry, true);
    } else {
        flags.set(Flag::Carry, false);
    }
    set_szp(flags, Width::Byte, u16::from(al));
    al
}

/// ASCII adjust after addition; operates on AX.
pub fn aaa(flags: &mut Flags, ax: u16) -> u16 {
    let [mut al, mut ah] = ax.to_le_bytes();
    let adjust = al & 0x0F > 9 || flags.get(Flag::AuxiliaryCarry);
    if adjust {
        al = al.wrapping_add(6);
        ah = ah.wrapping_add(1);
    }
    flags.set(Flag::AuxiliaryCarry, adjust);
    flags.set(Flag::Carry, adjust);
    u16::from_le_bytes([al & 0x0F, ah])
}

/// ASCII adjust after subtraction; operates on AX.
pub fn aas(flags: &mut Flags, ax: u16) -> u16 {
    let [mut al, mut ah] = ax.to_le_bytes();
    let adjust = al & 0x0F > 9 || flags.get(Flag::AuxiliaryCarry);
    if adjust {
        al = al.wrapping_sub(6);
        ah = ah.wrapping_sub(1);
    }
    flags.set(Flag::AuxiliaryCarry, adjust);
    flags.set(Flag::Carry, adjust);
    u16::from_le_bytes([al & 0x0F, ah])
}

/// ASCII adjust after multiply: AH = AL / base, AL = AL % base.
pub fn aam(flags: &mut Flags, al: u8, base: u8) -> Result<u16, DivideOverflow> {
    if base == 0 {
        return Err(DivideOverflow);
    }
    let ah = al / base;
    let al = al % base;
    set_szp(flags, Width::Byte, u16::from(al));
    Ok(u16::from_le_bytes([al, ah]))
}

/// ASCII adjust before division: AL = AH * base + AL, AH = 0.
pub fn aad(flags: &mut Flags, ax: u16, base: u8) -> u16 {
    let [al, ah] = ax.to_le_bytes();
    let al = ah.wrapping_mul(base).wrapping_add(al);
    set_szp(flags, Width::Byte, u16::from(al));
    u16::from(al)
}

#[cfg(test)]
mod tests;
