//! Instruction semantics.
//!
//! `execute` runs after the operand is resolved and the program counter has
//! moved past the instruction. It returns the cycles owed on top of the
//! table's base count (only branches owe any).

use crate::addressing::page_of;
use crate::alu;
use crate::bus::{read_u16, Bus, IRQ_VECTOR};
use crate::config::DecimalMode;
use crate::cpu::Cpu6502;
use crate::error::{CpuError, Diagnostic};
use crate::logging::{log, LogCategory, LogLevel};
use crate::opcodes::{Instruction, OpcodeInfo};
use crate::registers::{Flag, StatusFlags};

impl Cpu6502 {
    pub(crate) fn execute<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        info: OpcodeInfo,
        opcode: u8,
        address: Option<u16>,
    ) -> Result<u32, CpuError> {
        use Instruction::*;

        let addr = match address {
            Some(a) => a,
            None if info.instruction.uses_operand() => {
                return Err(self.fatal(Diagnostic::MissingOperand {
                    pc: self.instruction_pc,
                    opcode,
                }));
            }
            None => 0,
        };

        let p = self.regs.p;
        match info.instruction {
            // Loads, stores, transfers
            Lda => {
                self.regs.a = bus.read(addr);
                self.regs.p = alu::zn(p, self.regs.a);
            }
            Ldx => {
                self.regs.x = bus.read(addr);
                self.regs.p = alu::zn(p, self.regs.x);
            }
            Ldy => {
                self.regs.y = bus.read(addr);
                self.regs.p = alu::zn(p, self.regs.y);
            }
            Sta => bus.write(addr, self.regs.a),
            Stx => bus.write(addr, self.regs.x),
            Sty => bus.write(addr, self.regs.y),
            Tax => {
                self.regs.x = self.regs.a;
                self.regs.p = alu::zn(p, self.regs.x);
            }
            Tay => {
                self.regs.y = self.regs.a;
                self.regs.p = alu::zn(p, self.regs.y);
            }
            Txa => {
                self.regs.a = self.regs.x;
                self.regs.p = alu::zn(p, self.regs.a);
            }
            Tya => {
                self.regs.a = self.regs.y;
                self.regs.p = alu::zn(p, self.regs.a);
            }
            Tsx => {
                self.regs.x = self.regs.sp;
                self.regs.p = alu::zn(p, self.regs.x);
            }
            // no flags
            Txs => self.regs.sp = self.regs.x,

            // Arithmetic and logic
            Adc => {
                let m = bus.read(addr);
                let (a, p) = if self.decimal_active() {
                    alu::adc_decimal(self.regs.a, m, p)
                } else {
                    alu::adc(self.regs.a, m, p)
                };
                self.regs.a = a;
                self.regs.p = p;
            }
            Sbc => {
                let m = bus.read(addr);
                let (a, p) = if self.decimal_active() {
                    alu::sbc_decimal(self.regs.a, m, p)
                } else {
                    alu::sbc(self.regs.a, m, p)
                };
                self.regs.a = a;
                self.regs.p = p;
            }
            And => {
                self.regs.a &= bus.read(addr);
                self.regs.p = alu::zn(p, self.regs.a);
            }
            Ora => {
                self.regs.a |= bus.read(addr);
                self.regs.p = alu::zn(p, self.regs.a);
            }
            Eor => {
                self.regs.a ^= bus.read(addr);
                self.regs.p = alu::zn(p, self.regs.a);
            }
            Cmp => self.regs.p = alu::compare(self.regs.a, bus.read(addr), p),
            Cpx => self.regs.p = alu::compare(self.regs.x, bus.read(addr), p),
            Cpy => self.regs.p = alu::compare(self.regs.y, bus.read(addr), p),
            Bit => self.regs.p = alu::bit(self.regs.a, bus.read(addr), p),

            // Read-modify-write on memory
            Asl => self.modify(bus, addr, alu::asl),
            Lsr => self.modify(bus, addr, alu::lsr),
            Rol => self.modify(bus, addr, alu::rol),
            Ror => self.modify(bus, addr, alu::ror),
            Inc => self.modify(bus, addr, alu::inc),
            Dec => self.modify(bus, addr, alu::dec),

            // ... and on the accumulator
            AslA => self.modify_a(alu::asl),
            LsrA => self.modify_a(alu::lsr),
            RolA => self.modify_a(alu::rol),
            RorA => self.modify_a(alu::ror),

            Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p = alu::zn(p, self.regs.x);
            }
            Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p = alu::zn(p, self.regs.y);
            }
            Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p = alu::zn(p, self.regs.x);
            }
            Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p = alu::zn(p, self.regs.y);
            }

            // Branches
            Bcc => return Ok(self.branch(!p.test(Flag::Carry), addr)),
            Bcs => return Ok(self.branch(p.test(Flag::Carry), addr)),
            Bne => return Ok(self.branch(!p.test(Flag::Zero), addr)),
            Beq => return Ok(self.branch(p.test(Flag::Zero), addr)),
            Bpl => return Ok(self.branch(!p.test(Flag::Negative), addr)),
            Bmi => return Ok(self.branch(p.test(Flag::Negative), addr)),
            Bvc => return Ok(self.branch(!p.test(Flag::Overflow), addr)),
            Bvs => return Ok(self.branch(p.test(Flag::Overflow), addr)),

            // Jumps and subroutines
            Jmp => self.regs.pc = addr,
            Jsr => {
                // return address is the last byte of the JSR
                let ret = self.regs.pc.wrapping_sub(1);
                self.push_u16(bus, ret)?;
                self.regs.pc = addr;
            }
            Rts => {
                self.regs.pc = self.pop_u16(bus)?.wrapping_add(1);
            }
            Rti => {
                self.regs.p = StatusFlags::from_bits(self.pop(bus)?);
                self.regs.pc = self.pop_u16(bus)?;
            }
            Brk => {
                // skip the padding byte
                let ret = self.regs.pc.wrapping_add(1);
                self.push_u16(bus, ret)?;
                self.push(bus, p.pushed_by_instruction())?;
                self.regs.p.set(Flag::InterruptDisable);
                self.regs.pc = read_u16(bus, IRQ_VECTOR);
                log(LogCategory::Cpu, LogLevel::Debug, || {
                    format!(
                        "CPU: BRK at ${:04X}, returning to ${:04X}, handler ${:04X}",
                        self.instruction_pc, ret, self.regs.pc
                    )
                });
            }

            // Stack
            Pha => self.push(bus, self.regs.a)?,
            Php => self.push(bus, p.pushed_by_instruction())?,
            Pla => {
                self.regs.a = self.pop(bus)?;
                self.regs.p = alu::zn(p, self.regs.a);
            }
            Plp => self.regs.p = StatusFlags::from_bits(self.pop(bus)?),

            // Flags
            Clc => self.regs.p.clear(Flag::Carry),
            Sec => self.regs.p.set(Flag::Carry),
            Cli => self.regs.p.clear(Flag::InterruptDisable),
            Sei => self.regs.p.set(Flag::InterruptDisable),
            Cld => self.regs.p.clear(Flag::Decimal),
            Sed => self.regs.p.set(Flag::Decimal),
            Clv => self.regs.p.clear(Flag::Overflow),

            Nop => {}
        }
        Ok(0)
    }

    fn decimal_active(&self) -> bool {
        self.config.decimal_mode == DecimalMode::Nmos && self.regs.p.test(Flag::Decimal)
    }

    /// One read, one write
    #[inline]
    fn modify<B, F>(&mut self, bus: &mut B, addr: u16, op: F)
    where
        B: Bus + ?Sized,
        F: FnOnce(u8, StatusFlags) -> (u8, StatusFlags),
    {
        let (v, p) = op(bus.read(addr), self.regs.p);
        bus.write(addr, v);
        self.regs.p = p;
    }

    #[inline]
    fn modify_a<F>(&mut self, op: F)
    where
        F: FnOnce(u8, StatusFlags) -> (u8, StatusFlags),
    {
        let (a, p) = op(self.regs.a, self.regs.p);
        self.regs.a = a;
        self.regs.p = p;
    }

    /// Shared by every conditional branch. The page check compares the
    /// address after the branch instruction with the target.
    #[inline]
    fn branch(&mut self, taken: bool, target: u16) -> u32 {
        if !taken {
            return 0;
        }
        let extra = if page_of(self.regs.pc) != page_of(target) { 2 } else { 1 };
        self.regs.pc = target;
        extra
    }
}
