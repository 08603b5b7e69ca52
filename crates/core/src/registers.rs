//! 6502 register file and status-flag register.

use std::fmt;

/// Status register bits (NV-BDIZC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flag {
    Carry = 0x01,
    Zero = 0x02,
    InterruptDisable = 0x04,
    Decimal = 0x08,
    Break = 0x10,
    /// Bit 5, hardwired high
    Reserved = 0x20,
    Overflow = 0x40,
    Negative = 0x80,
}

impl Flag {
    #[inline]
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Processor status register.
///
/// The reserved bit is forced on by every constructor and can't be cleared.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// Build from a raw byte (e.g. pulled off the stack); reserved is forced on
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits | Flag::Reserved.mask())
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn set(&mut self, flag: Flag) {
        self.0 |= flag.mask();
    }

    #[inline]
    pub fn clear(&mut self, flag: Flag) {
        if flag != Flag::Reserved {
            self.0 &= !flag.mask();
        }
    }

    #[inline]
    pub fn assign(&mut self, flag: Flag, on: bool) {
        if on {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    #[inline]
    pub const fn test(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Value-returning form of [`assign`](Self::assign)
    #[inline]
    #[must_use]
    pub fn with(mut self, flag: Flag, on: bool) -> Self {
        self.assign(flag, on);
        self
    }

    /// Byte pushed by PHP/BRK: break and reserved set
    #[inline]
    pub const fn pushed_by_instruction(self) -> u8 {
        self.0 | Flag::Break.mask() | Flag::Reserved.mask()
    }

    /// Byte pushed by a hardware interrupt: break clear, reserved set
    #[inline]
    pub const fn pushed_by_interrupt(self) -> u8 {
        (self.0 & !Flag::Break.mask()) | Flag::Reserved.mask()
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::from_bits(0)
    }
}

impl fmt::Debug for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Flag, char); 8] = [
            (Flag::Negative, 'N'),
            (Flag::Overflow, 'V'),
            (Flag::Reserved, '-'),
            (Flag::Break, 'B'),
            (Flag::Decimal, 'D'),
            (Flag::InterruptDisable, 'I'),
            (Flag::Zero, 'Z'),
            (Flag::Carry, 'C'),
        ];
        let s: String = NAMES
            .iter()
            .map(|&(flag, c)| if self.test(flag) { c } else { '.' })
            .collect();
        write!(f, "StatusFlags({:02X} {})", self.0, s)
    }
}

/// Programmer-visible CPU registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (offset into $0100-$01FF)
    pub sp: u8,
    /// Status register
    pub p: StatusFlags,
    /// Program counter
    pub pc: u16,
}

impl Registers {
    /// State right after a reset: everything zeroed, SP at the top of the page.
    ///
    /// `pc` is loaded from the reset vector by the caller.
    pub fn after_reset() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            p: StatusFlags::default(),
            pc: 0,
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::after_reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bit_survives_everything() {
        let mut p = StatusFlags::from_bits(0x00);
        assert!(p.test(Flag::Reserved));
        p.clear(Flag::Reserved);
        assert!(p.test(Flag::Reserved));
        p.assign(Flag::Reserved, false);
        assert!(p.test(Flag::Reserved));
        assert_eq!(StatusFlags::from_bits(0xDF).bits(), 0xFF);
    }

    #[test]
    fn set_clear_assign_test() {
        let mut p = StatusFlags::default();
        p.set(Flag::Carry);
        assert!(p.test(Flag::Carry));
        p.clear(Flag::Carry);
        assert!(!p.test(Flag::Carry));
        p.assign(Flag::Overflow, true);
        assert_eq!(p.bits(), 0x60);
        let q = p.with(Flag::Overflow, false).with(Flag::Negative, true);
        assert_eq!(q.bits(), 0xA0);
        // `with` doesn't touch the original
        assert_eq!(p.bits(), 0x60);
    }

    #[test]
    fn pushed_images() {
        let p = StatusFlags::from_bits(0x01);
        assert_eq!(p.pushed_by_instruction(), 0x31);
        let q = StatusFlags::from_bits(0x11);
        assert_eq!(q.pushed_by_interrupt(), 0x21);
    }

    #[test]
    fn debug_format_lists_flags() {
        let p = StatusFlags::from_bits(0x83);
        assert_eq!(format!("{:?}", p), "StatusFlags(A3 N.-...ZC)");
    }

    #[test]
    fn reset_state() {
        let r = Registers::after_reset();
        assert_eq!((r.a, r.x, r.y, r.sp), (0, 0, 0, 0xFF));
        assert_eq!(r.p.bits(), 0x20);
    }
}
