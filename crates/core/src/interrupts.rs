//! Interrupt latch and the NMI/IRQ/reset service sequence.

use crate::bus::{read_u16, Bus, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use crate::cpu::Cpu6502;
use crate::error::CpuError;
use crate::logging::{log, LogCategory, LogLevel};
use crate::registers::Flag;

/// Cycles spent entering an interrupt handler or running the reset sequence
pub const INTERRUPT_CYCLES: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptKind {
    Nmi,
    Irq,
    Reset,
}

impl InterruptKind {
    pub const COUNT: usize = 3;
    pub const ALL: [InterruptKind; Self::COUNT] =
        [InterruptKind::Nmi, InterruptKind::Irq, InterruptKind::Reset];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            InterruptKind::Nmi => "nmi",
            InterruptKind::Irq => "irq",
            InterruptKind::Reset => "reset",
        }
    }

    /// Address the handler pointer is read from
    pub const fn vector(self) -> u16 {
        match self {
            InterruptKind::Nmi => NMI_VECTOR,
            InterruptKind::Irq => IRQ_VECTOR,
            InterruptKind::Reset => RESET_VECTOR,
        }
    }
}

/// Holds at most one pending interrupt.
///
/// A newer request replaces an older one, except that a pending reset is
/// never displaced by NMI or IRQ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptController {
    latched: Option<InterruptKind>,
}

impl InterruptController {
    pub fn request(&mut self, kind: InterruptKind) {
        if self.latched == Some(InterruptKind::Reset) && kind != InterruptKind::Reset {
            log(LogCategory::Interrupts, LogLevel::Debug, || {
                format!("Interrupts: {} ignored, reset pending", kind.name())
            });
            return;
        }
        if let Some(previous) = self.latched {
            if previous != kind {
                log(LogCategory::Interrupts, LogLevel::Debug, || {
                    format!("Interrupts: {} replaces {}", kind.name(), previous.name())
                });
            }
        }
        self.latched = Some(kind);
    }

    pub fn pending(&self) -> Option<InterruptKind> {
        self.latched
    }

    pub fn is_pending(&self) -> bool {
        self.latched.is_some()
    }

    /// Remove and return the latched request
    pub fn take(&mut self) -> Option<InterruptKind> {
        self.latched.take()
    }

    pub fn clear(&mut self) {
        self.latched = None;
    }
}

impl Cpu6502 {
    /// Service the latched interrupt, if any. Returns the cycles it cost.
    ///
    /// An IRQ that finds the I flag set is dropped, not held.
    pub(crate) fn service_interrupt<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32, CpuError> {
        let Some(kind) = self.interrupts.take() else {
            return Ok(0);
        };

        match kind {
            InterruptKind::Reset => {
                self.reset(bus);
                self.record_interrupt(kind);
                Ok(INTERRUPT_CYCLES)
            }
            InterruptKind::Irq if self.regs.p.test(Flag::InterruptDisable) => {
                log(LogCategory::Interrupts, LogLevel::Debug, || {
                    "Interrupts: irq dropped, I flag set".to_string()
                });
                Ok(0)
            }
            InterruptKind::Nmi | InterruptKind::Irq => {
                let return_pc = self.regs.pc;
                self.instruction_pc = return_pc;
                self.push_u16(bus, return_pc)?;
                self.push(bus, self.regs.p.pushed_by_interrupt())?;
                self.regs.p.set(Flag::InterruptDisable);
                self.regs.pc = read_u16(bus, kind.vector());
                self.record_interrupt(kind);
                log(LogCategory::Interrupts, LogLevel::Debug, || {
                    format!(
                        "Interrupts: {} from ${:04X} to ${:04X}",
                        kind.name(),
                        return_pc,
                        self.regs.pc
                    )
                });
                Ok(INTERRUPT_CYCLES)
            }
        }
    }

    fn record_interrupt(&mut self, kind: InterruptKind) {
        if self.config.collect_stats {
            self.stats.record_interrupt(kind);
        }
    }
}
