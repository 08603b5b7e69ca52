//! Error taxonomy and the diagnostic reporting channel.

use crate::logging::{log, LogCategory, LogLevel};

/// How bad a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Execution can continue (possibly after a policy decision)
    Recoverable,
    /// A precondition was violated; the current step is aborted
    Fatal,
}

/// Something the CPU noticed while executing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("illegal opcode ${opcode:02X} at ${pc:04X}")]
    IllegalOpcode { pc: u16, opcode: u8 },

    #[error("stack pointer wrapped below $0100 at ${pc:04X}")]
    StackOverflow { pc: u16 },

    #[error("stack pointer wrapped above $01FF at ${pc:04X}")]
    StackUnderflow { pc: u16 },

    #[error("opcode ${opcode:02X} at ${pc:04X} needs an operand but its addressing mode has none")]
    MissingOperand { pc: u16, opcode: u8 },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::IllegalOpcode { .. } => Severity::Recoverable,
            Diagnostic::StackOverflow { .. }
            | Diagnostic::StackUnderflow { .. }
            | Diagnostic::MissingOperand { .. } => Severity::Fatal,
        }
    }
}

/// Errors returned from stepping the CPU
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CpuError {
    #[error("fatal: {0}")]
    Fatal(Diagnostic),

    /// The CPU hit an illegal opcode under the halt policy and stays stopped
    /// until reset
    #[error("CPU jammed on opcode ${opcode:02X} at ${pc:04X}")]
    Jammed { pc: u16, opcode: u8 },
}

/// Errors loading a [`CpuConfig`](crate::config::CpuConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Receiver for every diagnostic the CPU produces
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: &Diagnostic);
}

/// Default sink: writes diagnostics to the CPU log category
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: &Diagnostic) {
        let level = match diagnostic.severity() {
            Severity::Recoverable => LogLevel::Warn,
            Severity::Fatal => LogLevel::Error,
        };
        log(LogCategory::Cpu, level, || format!("CPU: {}", diagnostic));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities() {
        assert_eq!(
            Diagnostic::IllegalOpcode { pc: 0, opcode: 0x02 }.severity(),
            Severity::Recoverable
        );
        assert_eq!(
            Diagnostic::StackOverflow { pc: 0 }.severity(),
            Severity::Fatal
        );
        assert_eq!(
            Diagnostic::MissingOperand { pc: 0, opcode: 0 }.severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn messages_include_address_and_opcode() {
        let d = Diagnostic::IllegalOpcode {
            pc: 0x8001,
            opcode: 0x02,
        };
        assert_eq!(d.to_string(), "illegal opcode $02 at $8001");
        let e = CpuError::Fatal(Diagnostic::StackUnderflow { pc: 0xC000 });
        assert_eq!(e.to_string(), "fatal: stack pointer wrapped above $01FF at $C000");
    }

    #[test]
    fn config_error_from_json() {
        let err: ConfigError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("invalid config"));
    }
}
