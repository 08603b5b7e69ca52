//! Pure ALU and flag helpers.
//!
//! Every function takes the operands plus the current flags by value and
//! returns the result together with the updated flags. Nothing here touches
//! registers or the bus, so the executor stays a thin layer of plumbing.

use crate::registers::{Flag, StatusFlags};

/// Update Zero and Negative from `value`
#[inline]
pub fn zn(p: StatusFlags, value: u8) -> StatusFlags {
    p.with(Flag::Zero, value == 0)
        .with(Flag::Negative, value & 0x80 != 0)
}

/// Binary add with carry
#[inline]
pub fn adc(a: u8, m: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let sum = a as u16 + m as u16 + p.test(Flag::Carry) as u16;
    let result = sum as u8;
    let overflow = (!(a ^ m) & (a ^ result) & 0x80) != 0;
    let p = p
        .with(Flag::Carry, sum > 0xFF)
        .with(Flag::Overflow, overflow);
    (result, zn(p, result))
}

/// Binary subtract with borrow (carry clear = borrow)
#[inline]
pub fn sbc(a: u8, m: u8, p: StatusFlags) -> (u8, StatusFlags) {
    adc(a, !m, p)
}

/// NMOS decimal add.
///
/// Zero comes from the binary sum; Negative and Overflow from the
/// intermediate value before the high digit is corrected.
pub fn adc_decimal(a: u8, m: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let carry = p.test(Flag::Carry) as u16;
    let binary = (a as u16 + m as u16 + carry) as u8;

    let mut lo = (a & 0x0F) as u16 + (m & 0x0F) as u16 + carry;
    let mut hi = (a >> 4) as u16 + (m >> 4) as u16;
    if lo > 9 {
        lo = (lo + 6) & 0x0F;
        hi += 1;
    }
    let intermediate = ((hi << 4) | lo) as u8;
    let overflow = (!(a ^ m) & (a ^ intermediate) & 0x80) != 0;
    let negative = intermediate & 0x80 != 0;
    if hi > 9 {
        hi += 6;
    }
    let result = ((hi << 4) | lo) as u8;

    let p = p
        .with(Flag::Carry, hi > 0x0F)
        .with(Flag::Overflow, overflow)
        .with(Flag::Zero, binary == 0)
        .with(Flag::Negative, negative);
    (result, p)
}

/// NMOS decimal subtract. All flags come from the binary subtraction.
pub fn sbc_decimal(a: u8, m: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let (_, flags) = sbc(a, m, p);
    let borrow = !p.test(Flag::Carry) as i16;

    let mut lo = (a & 0x0F) as i16 - (m & 0x0F) as i16 - borrow;
    let mut hi = (a >> 4) as i16 - (m >> 4) as i16;
    if lo < 0 {
        lo = (lo - 6) & 0x0F;
        hi -= 1;
    }
    if hi < 0 {
        hi -= 6;
    }
    let result = (((hi << 4) | lo) & 0xFF) as u8;
    (result, flags)
}

/// Compare `reg - m`: carry means no borrow
#[inline]
pub fn compare(reg: u8, m: u8, p: StatusFlags) -> StatusFlags {
    let diff = reg.wrapping_sub(m);
    zn(p.with(Flag::Carry, reg >= m), diff)
}

/// BIT: N and V copied from memory, Z from `a & m`
#[inline]
pub fn bit(a: u8, m: u8, p: StatusFlags) -> StatusFlags {
    p.with(Flag::Negative, m & 0x80 != 0)
        .with(Flag::Overflow, m & 0x40 != 0)
        .with(Flag::Zero, a & m == 0)
}

#[inline]
pub fn asl(v: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let r = v << 1;
    (r, zn(p.with(Flag::Carry, v & 0x80 != 0), r))
}

/// Logical shift right. The result can't be negative so N is forced clear.
#[inline]
pub fn lsr(v: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let r = v >> 1;
    let p = p
        .with(Flag::Carry, v & 0x01 != 0)
        .with(Flag::Zero, r == 0)
        .with(Flag::Negative, false);
    (r, p)
}

#[inline]
pub fn rol(v: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let r = (v << 1) | p.test(Flag::Carry) as u8;
    (r, zn(p.with(Flag::Carry, v & 0x80 != 0), r))
}

#[inline]
pub fn ror(v: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let r = (v >> 1) | ((p.test(Flag::Carry) as u8) << 7);
    (r, zn(p.with(Flag::Carry, v & 0x01 != 0), r))
}

#[inline]
pub fn inc(v: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let r = v.wrapping_add(1);
    (r, zn(p, r))
}

#[inline]
pub fn dec(v: u8, p: StatusFlags) -> (u8, StatusFlags) {
    let r = v.wrapping_sub(1);
    (r, zn(p, r))
}
