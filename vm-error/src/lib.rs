//! Unified error handling for the golden-value oracle
//!
//! 三类错误严格区分：
//! - 配置错误（表构建期致命，终止整次运行）
//! - 执行适配器错误（记为 UNSUPPORTED，不致命）
//! - 结果不符（不是错误，是判定结果，由 `vm-oracle` 的 `Verdict` 表达）

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unified error type for all oracle components
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum OracleError {
    #[error("Configuration error: {message}")]
    Configuration {
        source: ConfigError,
        message: String,
    },

    #[error("Operand error in {mnemonic}: {source}")]
    Operand {
        source: OperandError,
        mnemonic: String,
    },

    #[error("Replay error: {message}")]
    Replay {
        source: ReplayError,
        message: String,
    },

    #[error("I/O error: {message}")]
    Io { message: String },
}

/// Configuration errors (fatal, reported before any case runs)
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("No reference function registered for instruction: {0}")]
    MissingReference(String),

    #[error("Invalid arity for {0}: {1} (expected 1..=3)")]
    InvalidArity(String, usize),

    #[error("Duplicate instruction mnemonic: {0}")]
    DuplicateMnemonic(String),

    #[error("Operand type {1} of {0} has no corpus slice")]
    EmptyCorpusSlice(String, String),

    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),

    #[error("Invalid configuration value: {0} = {1}")]
    InvalidValue(String, String),

    #[error("Configuration parsing error: {0}")]
    ParseError(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Operand tuple violations detected by reference functions
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandError {
    #[error("operand {index} has type {found}, expected {expected}")]
    TypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("operand {0} is missing")]
    Missing(usize),

    #[error("operand {index} of type {ty} has no values in the corpus")]
    EmptySlice { index: usize, ty: String },
}

/// Execution adapter failures, recorded as UNSUPPORTED verdicts
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterError {
    #[error("{mnemonic} is not supported by this executor: {reason}")]
    Unsupported { mnemonic: String, reason: String },

    #[error("no observation recorded for {mnemonic} {case}")]
    MissingObservation { mnemonic: String, case: String },

    #[error("executor fault while running {mnemonic}: {message}")]
    Fault { mnemonic: String, message: String },
}

/// Malformed observation dumps
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: unknown instruction {mnemonic}")]
    UnknownInstruction { line: usize, mnemonic: String },
}

impl From<ConfigError> for OracleError {
    fn from(source: ConfigError) -> Self {
        let message = source.to_string();
        OracleError::Configuration { source, message }
    }
}

impl From<ReplayError> for OracleError {
    fn from(source: ReplayError) -> Self {
        let message = source.to_string();
        OracleError::Replay { source, message }
    }
}

impl From<std::io::Error> for OracleError {
    fn from(error: std::io::Error) -> Self {
        OracleError::Io {
            message: error.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type OracleResult<T> = Result<T, OracleError>;

/// 为适配器错误附带助记符
impl AdapterError {
    pub fn unsupported(mnemonic: impl Into<String>, reason: impl Into<String>) -> Self {
        AdapterError::Unsupported {
            mnemonic: mnemonic.into(),
            reason: reason.into(),
        }
    }

    pub fn fault(mnemonic: impl Into<String>, message: impl Into<String>) -> Self {
        AdapterError::Fault {
            mnemonic: mnemonic.into(),
            message: message.into(),
        }
    }
}

/// Utility functions for error handling
pub mod utils {
    use super::*;

    /// Log error with the component it surfaced in, at a level matching its severity
    pub fn log_error(error: &OracleError, component: &str) {
        let severity = error_severity(error);
        let level = match severity {
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error | ErrorSeverity::Critical => log::Level::Error,
        };
        log::log!(level, "[{}] Error in {}: {}", severity, component, error);
    }

    /// Get error severity level
    pub fn error_severity(error: &OracleError) -> ErrorSeverity {
        match error {
            OracleError::Configuration { .. } => ErrorSeverity::Critical,
            OracleError::Operand { .. } => ErrorSeverity::Critical,
            OracleError::Replay {
                source: ReplayError::UnknownInstruction { .. },
                ..
            } => ErrorSeverity::Warning,
            OracleError::Replay { .. } => ErrorSeverity::Error,
            OracleError::Io { .. } => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_conversion() {
        let error: OracleError = ConfigError::MissingReference("fadd".to_string()).into();
        assert!(matches!(
            error,
            OracleError::Configuration {
                source: ConfigError::MissingReference(_),
                ..
            }
        ));
        assert!(error.to_string().contains("fadd"));
    }

    #[test]
    fn test_error_severity() {
        let error: OracleError = ConfigError::DuplicateMnemonic("vaddubm".to_string()).into();
        assert_eq!(utils::error_severity(&error), ErrorSeverity::Critical);

        let replay: OracleError = ReplayError::Malformed {
            line: 3,
            reason: "missing '->'".to_string(),
        }
        .into();
        assert_eq!(utils::error_severity(&replay), ErrorSeverity::Error);

        let unknown: OracleError = ReplayError::UnknownInstruction {
            line: 1,
            mnemonic: "frob".to_string(),
        }
        .into();
        assert_eq!(utils::error_severity(&unknown), ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_adapter_error_message() {
        let error = AdapterError::unsupported("fres", "no host equivalent");
        assert_eq!(
            error.to_string(),
            "fres is not supported by this executor: no host equivalent"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "dump.txt");
        let error: OracleError = io.into();
        assert!(matches!(error, OracleError::Io { .. }));
    }
}
