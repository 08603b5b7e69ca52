//! 6502 CPU context: register file, interrupt latch, configuration and the
//! fetch/decode/execute step.
//!
//! The bus is never owned; every call that touches memory borrows it.

use crate::addressing;
use crate::bus::{read_u16, Bus, RESET_VECTOR, STACK_BASE};
use crate::config::{CpuConfig, IllegalOpcodePolicy};
use crate::error::{CpuError, Diagnostic, DiagnosticSink, LogSink};
use crate::interrupts::{InterruptController, InterruptKind};
use crate::logging::{log, LogCategory, LogLevel};
use crate::opcodes::{OpcodeInfo, OpcodeTable};
use crate::registers::Registers;
use crate::stats::ExecutionStats;
use crate::Cpu;
use std::fmt;

/// Cycles charged for an illegal opcode under the NOP policy
const ILLEGAL_NOP_CYCLES: u32 = 2;

pub struct Cpu6502 {
    pub(crate) regs: Registers,
    pub(crate) interrupts: InterruptController,
    pub(crate) config: CpuConfig,
    pub(crate) stats: ExecutionStats,
    table: OpcodeTable,
    sink: Box<dyn DiagnosticSink>,
    /// Address of the instruction being executed, for diagnostics
    pub(crate) instruction_pc: u16,
    /// Set by an illegal opcode under the halt policy
    jammed: Option<(u16, u8)>,
    /// Cycles since the last reset
    total_cycles: u64,
}

impl fmt::Debug for Cpu6502 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu6502")
            .field("regs", &self.regs)
            .field("interrupts", &self.interrupts)
            .field("config", &self.config)
            .field("jammed", &self.jammed)
            .field("total_cycles", &self.total_cycles)
            .finish_non_exhaustive()
    }
}

impl Default for Cpu6502 {
    fn default() -> Self {
        Self::new(CpuConfig::default())
    }
}

impl Cpu6502 {
    /// CPU with the documented opcode set.
    ///
    /// Registers hold their reset values but the program counter is only
    /// loaded by [`reset`](Self::reset).
    pub fn new(config: CpuConfig) -> Self {
        Self::with_table(config, OpcodeTable::official())
    }

    /// CPU driven by a custom opcode table
    pub fn with_table(config: CpuConfig, table: OpcodeTable) -> Self {
        Self {
            regs: Registers::after_reset(),
            interrupts: InterruptController::default(),
            config,
            stats: ExecutionStats::default(),
            table,
            sink: Box::new(LogSink),
            instruction_pc: 0,
            jammed: None,
            total_cycles: 0,
        }
    }

    /// Route diagnostics somewhere other than the log
    pub fn set_diagnostic_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptController {
        &mut self.interrupts
    }

    pub fn is_jammed(&self) -> bool {
        self.jammed.is_some()
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Latch an interrupt; it's serviced at the start of the next step
    pub fn request_interrupt(&mut self, kind: InterruptKind) {
        self.interrupts.request(kind);
    }

    /// Reinitialize registers, drop any latched interrupt and load the
    /// program counter from the reset vector.
    pub fn reset<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.regs = Registers::after_reset();
        self.regs.pc = read_u16(bus, RESET_VECTOR);
        self.interrupts.clear();
        self.stats.clear();
        self.jammed = None;
        self.total_cycles = 0;
        log(LogCategory::Cpu, LogLevel::Info, || {
            format!("CPU: reset, PC=${:04X}", self.regs.pc)
        });
    }

    /// Execute one instruction, servicing a latched interrupt first.
    ///
    /// Returns the cycles consumed, interrupt sequence included.
    pub fn step<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32, CpuError> {
        if let Some((pc, opcode)) = self.jammed {
            if self.interrupts.pending() != Some(InterruptKind::Reset) {
                return Err(CpuError::Jammed { pc, opcode });
            }
        }

        let mut cycles = self.service_interrupt(bus)?;

        let opcode_pc = self.regs.pc;
        self.instruction_pc = opcode_pc;
        let opcode = bus.read(opcode_pc);

        let Some(info) = self.table.get(opcode) else {
            // interrupt entry already happened, count it even if we jam here
            self.total_cycles += cycles as u64;
            let nop = self.illegal_opcode(opcode_pc, opcode)?;
            self.total_cycles += nop as u64;
            return Ok(cycles + nop);
        };

        let operand_pc = opcode_pc.wrapping_add(1);
        let resolved = addressing::resolve(
            info.mode,
            info.cycles,
            operand_pc,
            self.regs.x,
            self.regs.y,
            bus,
        );
        self.trace(opcode, info, resolved.address);
        self.regs.pc = opcode_pc.wrapping_add(info.size as u16);

        let extra = self.execute(bus, info, opcode, resolved.address)?;
        if self.config.collect_stats {
            self.stats.record(info.instruction, info.mode);
        }
        cycles += info.cycles as u32 + resolved.penalty as u32 + extra;
        self.total_cycles += cycles as u64;
        Ok(cycles)
    }

    fn illegal_opcode(&mut self, pc: u16, opcode: u8) -> Result<u32, CpuError> {
        self.sink.report(&Diagnostic::IllegalOpcode { pc, opcode });
        match self.config.illegal_opcode {
            IllegalOpcodePolicy::Nop => {
                self.regs.pc = pc.wrapping_add(1);
                Ok(ILLEGAL_NOP_CYCLES)
            }
            IllegalOpcodePolicy::Halt => {
                self.jammed = Some((pc, opcode));
                Err(CpuError::Jammed { pc, opcode })
            }
        }
    }

    fn trace(&self, opcode: u8, info: OpcodeInfo, address: Option<u16>) {
        log(LogCategory::Cpu, LogLevel::Trace, || {
            let r = &self.regs;
            let operand = match address {
                Some(a) => format!("${:04X}", a),
                None => String::new(),
            };
            format!(
                "CPU: ${:04X} {:02X} {:<5} {:<16} {:<6} A={:02X} X={:02X} Y={:02X} P={:02X} SP={:02X}",
                self.instruction_pc,
                opcode,
                info.instruction.key(),
                info.mode.name(),
                operand,
                r.a,
                r.x,
                r.y,
                r.p.bits(),
                r.sp
            )
        });
    }

    /// Report a fatal diagnostic and turn it into the step's error
    pub(crate) fn fatal(&mut self, diagnostic: Diagnostic) -> CpuError {
        self.sink.report(&diagnostic);
        CpuError::Fatal(diagnostic)
    }

    pub(crate) fn push<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u8) -> Result<(), CpuError> {
        if self.config.strict_address_wrap && self.regs.sp == 0x00 {
            return Err(self.fatal(Diagnostic::StackOverflow {
                pc: self.instruction_pc,
            }));
        }
        bus.write(STACK_BASE | self.regs.sp as u16, value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        Ok(())
    }

    pub(crate) fn pop<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u8, CpuError> {
        if self.config.strict_address_wrap && self.regs.sp == 0xFF {
            return Err(self.fatal(Diagnostic::StackUnderflow {
                pc: self.instruction_pc,
            }));
        }
        self.regs.sp = self.regs.sp.wrapping_add(1);
        Ok(bus.read(STACK_BASE | self.regs.sp as u16))
    }

    /// Push high byte first, so the word sits little-endian in memory
    pub(crate) fn push_u16<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u16) -> Result<(), CpuError> {
        self.push(bus, (value >> 8) as u8)?;
        self.push(bus, (value & 0xFF) as u8)
    }

    pub(crate) fn pop_u16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u16, CpuError> {
        let lo = self.pop(bus)? as u16;
        let hi = self.pop(bus)? as u16;
        Ok((hi << 8) | lo)
    }
}

impl Cpu for Cpu6502 {
    fn reset<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        Cpu6502::reset(self, bus);
    }

    fn step<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32, CpuError> {
        Cpu6502::step(self, bus)
    }

    fn interrupts_mut(&mut self) -> &mut InterruptController {
        &mut self.interrupts
    }
}
