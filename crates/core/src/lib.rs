//! 6502-family CPU core: instruction execution, interrupts and the
//! scanline-budgeted frame loop.

pub mod addressing;
pub mod alu;
pub mod bus;
pub mod config;
pub mod cpu;
pub mod error;
mod executor;
pub mod interrupts;
pub mod logging;
pub mod opcodes;
pub mod registers;
pub mod scheduler;
pub mod stats;

pub use bus::{Bus, FlatMemory};
pub use config::{CpuConfig, DecimalMode, IllegalOpcodePolicy};
pub use cpu::Cpu6502;
pub use error::{ConfigError, CpuError, Diagnostic, DiagnosticSink, LogSink, Severity};
pub use interrupts::{InterruptController, InterruptKind};
pub use opcodes::{AddressingMode, Instruction, OpcodeInfo, OpcodeTable};
pub use registers::{Flag, Registers, StatusFlags};
pub use scheduler::{FrameReport, FrameScheduler, ScanlineSync, CYCLES_PER_SCANLINE};
pub use stats::ExecutionStats;

/// A CPU-like component that can be stepped; returns cycles consumed.
pub trait Cpu {
    fn reset<B: Bus + ?Sized>(&mut self, bus: &mut B);
    fn step<B: Bus + ?Sized>(&mut self, bus: &mut B) -> Result<u32, CpuError>;
    /// Latch that peripherals raise interrupts through
    fn interrupts_mut(&mut self) -> &mut InterruptController;
}
