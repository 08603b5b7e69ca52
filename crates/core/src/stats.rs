//! Execution statistics: counts per instruction, addressing mode and interrupt kind.
//!
//! Purely informational; only updated when `CpuConfig::collect_stats` is set.

use crate::interrupts::InterruptKind;
use crate::opcodes::{AddressingMode, Instruction};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStats {
    instructions: u64,
    by_instruction: [u64; Instruction::COUNT],
    by_mode: [u64; AddressingMode::COUNT],
    interrupts: [u64; InterruptKind::COUNT],
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self {
            instructions: 0,
            by_instruction: [0; Instruction::COUNT],
            by_mode: [0; AddressingMode::COUNT],
            interrupts: [0; InterruptKind::COUNT],
        }
    }
}

impl ExecutionStats {
    #[inline]
    pub fn record(&mut self, instruction: Instruction, mode: AddressingMode) {
        self.instructions += 1;
        self.by_instruction[instruction.index()] += 1;
        self.by_mode[mode.index()] += 1;
    }

    #[inline]
    pub fn record_interrupt(&mut self, kind: InterruptKind) {
        self.interrupts[kind.index()] += 1;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Instructions executed
    pub fn total(&self) -> u64 {
        self.instructions
    }

    pub fn count(&self, instruction: Instruction) -> u64 {
        self.by_instruction[instruction.index()]
    }

    pub fn count_mode(&self, mode: AddressingMode) -> u64 {
        self.by_mode[mode.index()]
    }

    pub fn count_interrupts(&self, kind: InterruptKind) -> u64 {
        self.interrupts[kind.index()]
    }

    /// The `n` most executed instructions, ties broken by name
    pub fn busiest(&self, n: usize) -> Vec<(Instruction, u64)> {
        let mut rows: Vec<(Instruction, u64)> = Instruction::ALL
            .iter()
            .map(|&i| (i, self.count(i)))
            .filter(|&(_, c)| c > 0)
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.key().cmp(b.0.key())));
        rows.truncate(n);
        rows
    }

    /// JSON summary; zero counts are left out
    pub fn to_json(&self) -> Value {
        let mut instructions = Map::new();
        for inst in Instruction::ALL {
            let c = self.count(inst);
            if c > 0 {
                instructions.insert(inst.key().to_string(), json!(c));
            }
        }
        let mut modes = Map::new();
        for mode in AddressingMode::ALL {
            let c = self.count_mode(mode);
            if c > 0 {
                modes.insert(mode.name().to_string(), json!(c));
            }
        }
        let mut interrupts = Map::new();
        for kind in InterruptKind::ALL {
            let c = self.count_interrupts(kind);
            if c > 0 {
                interrupts.insert(kind.name().to_string(), json!(c));
            }
        }
        json!({
            "instructions": self.instructions,
            "by_instruction": instructions,
            "by_mode": modes,
            "interrupts": interrupts,
        })
    }
}
