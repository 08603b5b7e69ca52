//! Addressing-mode resolution.
//!
//! `resolve` reads the operand bytes that follow an opcode and turns them into
//! an effective address. It never touches the program counter: the caller
//! advances it by the instruction length from the opcode table.

use crate::bus::{read_u16, Bus};
use crate::opcodes::AddressingMode;

/// Result of resolving one instruction's operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Effective address; `None` for implied. For immediate this is the
    /// address of the operand byte itself.
    pub address: Option<u16>,
    /// Indexing moved the address into another 256-byte page
    pub page_crossed: bool,
    /// Extra cycle owed for the page cross (0 or 1)
    pub penalty: u8,
}

impl Resolved {
    const fn implied() -> Self {
        Self {
            address: None,
            page_crossed: false,
            penalty: 0,
        }
    }

    const fn at(address: u16) -> Self {
        Self {
            address: Some(address),
            page_crossed: false,
            penalty: 0,
        }
    }

    /// `base + index`, charging a cycle on page cross when the instruction's
    /// listed cost is exactly `threshold`
    fn indexed(base: u16, index: u8, base_cycles: u8, threshold: u8) -> Self {
        let address = base.wrapping_add(index as u16);
        let page_crossed = page_of(base) != page_of(address);
        Self {
            address: Some(address),
            page_crossed,
            penalty: (page_crossed && base_cycles == threshold) as u8,
        }
    }
}

#[inline]
pub const fn page_of(addr: u16) -> u16 {
    addr & 0xFF00
}

/// Read a pointer the way `JMP ($xxFF)` does: the high byte comes from the
/// start of the same page, not the next one.
#[inline]
pub fn read_u16_page_wrapped<B: Bus + ?Sized>(bus: &mut B, pointer: u16) -> u16 {
    let lo = bus.read(pointer) as u16;
    let hi_addr = page_of(pointer) | (pointer.wrapping_add(1) & 0x00FF);
    let hi = bus.read(hi_addr) as u16;
    (hi << 8) | lo
}

/// Read a pointer from the zero page; the high byte wraps from $FF to $00
#[inline]
fn read_zero_page_u16<B: Bus + ?Sized>(bus: &mut B, zp: u8) -> u16 {
    let lo = bus.read(zp as u16) as u16;
    let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
    (hi << 8) | lo
}

/// Resolve the operand of an instruction.
///
/// `operand_pc` is the address right after the opcode byte. `base_cycles` is
/// the table's cycle count, which decides whether a page cross costs extra:
/// absolute-indexed modes only charge 4-cycle instructions and (zp),Y only
/// charges 5-cycle ones, since stores and read-modify-write instructions
/// already include the extra cycle in their listed cost.
pub fn resolve<B: Bus + ?Sized>(
    mode: AddressingMode,
    base_cycles: u8,
    operand_pc: u16,
    x: u8,
    y: u8,
    bus: &mut B,
) -> Resolved {
    match mode {
        AddressingMode::Implied => Resolved::implied(),
        AddressingMode::Immediate => Resolved::at(operand_pc),
        AddressingMode::ZeroPage => Resolved::at(bus.read(operand_pc) as u16),
        AddressingMode::ZeroPageX => Resolved::at(bus.read(operand_pc).wrapping_add(x) as u16),
        AddressingMode::ZeroPageY => Resolved::at(bus.read(operand_pc).wrapping_add(y) as u16),
        AddressingMode::Absolute => Resolved::at(read_u16(bus, operand_pc)),
        AddressingMode::AbsoluteX => {
            let base = read_u16(bus, operand_pc);
            Resolved::indexed(base, x, base_cycles, 4)
        }
        AddressingMode::AbsoluteY => {
            let base = read_u16(bus, operand_pc);
            Resolved::indexed(base, y, base_cycles, 4)
        }
        AddressingMode::Indirect => {
            let pointer = read_u16(bus, operand_pc);
            Resolved::at(read_u16_page_wrapped(bus, pointer))
        }
        AddressingMode::IndexedIndirect => {
            let zp = bus.read(operand_pc).wrapping_add(x);
            Resolved::at(read_zero_page_u16(bus, zp))
        }
        AddressingMode::IndirectIndexed => {
            let zp = bus.read(operand_pc);
            let base = read_zero_page_u16(bus, zp);
            Resolved::indexed(base, y, base_cycles, 5)
        }
        AddressingMode::Relative => {
            let offset = bus.read(operand_pc) as i8;
            let next = operand_pc.wrapping_add(1);
            Resolved::at(next.wrapping_add(offset as u16))
        }
    }
}
