//! Frame loop: steps the CPU and hands control to the video side once per
//! scanline's worth of cycles until it reports the frame is done.

use crate::bus::Bus;
use crate::error::CpuError;
use crate::interrupts::InterruptController;
use crate::logging::{log, LogCategory, LogLevel};
use crate::Cpu;

/// CPU cycles per scanline on the NTSC console
pub const CYCLES_PER_SCANLINE: u32 = 114;

/// Hook called at every scanline boundary.
///
/// The CPU's interrupt controller is passed in so the peripheral can raise an
/// NMI (e.g. at vertical blank) while the loop holds the CPU.
pub trait ScanlineSync {
    /// Advance one scanline; return `true` when the frame is complete
    fn step_scanline(&mut self, interrupts: &mut InterruptController) -> bool;
}

impl<F> ScanlineSync for F
where
    F: FnMut(&mut InterruptController) -> bool,
{
    fn step_scanline(&mut self, interrupts: &mut InterruptController) -> bool {
        self(interrupts)
    }
}

/// What one call to [`FrameScheduler::run_frame`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub cycles: u64,
    pub instructions: u64,
    pub scanlines: u32,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    budget: u32,
    /// Cycles executed past the last scanline boundary
    residual: u32,
    frames: u64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::with_budget(CYCLES_PER_SCANLINE)
    }

    /// Scheduler with a custom per-scanline budget.
    ///
    /// A budget of 0 is clamped to 1 cycle.
    pub fn with_budget(budget: u32) -> Self {
        Self {
            budget: budget.max(1),
            residual: 0,
            frames: 0,
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn residual(&self) -> u32 {
        self.residual
    }

    /// Frames completed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn reset(&mut self) {
        self.residual = 0;
        self.frames = 0;
    }

    /// Run until `sync` reports the end of a frame.
    ///
    /// Instructions are never split: the budget is checked between them and
    /// any overshoot carries into the next scanline (and the next frame).
    pub fn run_frame<C, B, S>(
        &mut self,
        cpu: &mut C,
        bus: &mut B,
        sync: &mut S,
    ) -> Result<FrameReport, CpuError>
    where
        C: Cpu + ?Sized,
        B: Bus + ?Sized,
        S: ScanlineSync + ?Sized,
    {
        let mut report = FrameReport::default();
        loop {
            while self.residual > self.budget {
                self.residual -= self.budget;
                report.scanlines += 1;
                log(LogCategory::Scheduler, LogLevel::Trace, || {
                    format!(
                        "Scheduler: scanline {} done, {} cycles carried",
                        report.scanlines, self.residual
                    )
                });
                if sync.step_scanline(cpu.interrupts_mut()) {
                    self.frames += 1;
                    log(LogCategory::Scheduler, LogLevel::Debug, || {
                        format!(
                            "Scheduler: frame {} complete ({} cycles, {} instructions, {} scanlines)",
                            self.frames, report.cycles, report.instructions, report.scanlines
                        )
                    });
                    return Ok(report);
                }
            }
            let cycles = cpu.step(bus)?;
            self.residual += cycles;
            report.cycles += cycles as u64;
            report.instructions += 1;
        }
    }
}
