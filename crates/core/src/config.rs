//! CPU configuration.
//!
//! Serialized as JSON so a host can keep it next to its own settings file.

use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How ADC/SBC treat the Decimal flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalMode {
    /// The flag is stored and pushed but arithmetic is always binary.
    /// This is the console CPU's behavior.
    #[default]
    Ignored,
    /// NMOS 6502 BCD correction
    Nmos,
}

/// What to do with an opcode that has no table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IllegalOpcodePolicy {
    /// Report it, then treat it as a one-byte, two-cycle NOP
    #[default]
    Nop,
    /// Report it and stop the CPU until reset
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CpuConfig {
    /// Treat stack pointer wraparound as a fatal error
    pub strict_address_wrap: bool,
    pub decimal_mode: DecimalMode,
    pub illegal_opcode: IllegalOpcodePolicy,
    /// Count executed instructions per opcode/addressing mode
    pub collect_stats: bool,
}

impl CpuConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        log(LogCategory::Config, LogLevel::Info, || {
            format!("Config: loaded {} -> {:?}", path.display(), config)
        });
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
