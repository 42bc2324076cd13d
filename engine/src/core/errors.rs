/*!
 * Error Types
 * Centralized error handling with thiserror and serde support
 */

use crate::core::types::{Fd, SignalNumber};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for signal operations
pub type SignalResult<T> = std::result::Result<T, SignalError>;

/// Signal subsystem errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SignalError {
    #[error("Invalid signal number: {0}")]
    InvalidSignal(SignalNumber),

    #[error("Failed to install disposition for signal {signal}: {reason}")]
    DispositionFailed {
        signal: SignalNumber,
        reason: String,
    },
}

/// Notifier subsystem errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum NotifierError {
    #[error("Notifier already registered for fd {0}")]
    AlreadyRegistered(Fd),
}

/// Unified engine error type
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum EngineError {
    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),

    #[error("Wake pipe error: {0}")]
    WakePipe(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_error_serialization() {
        let error = SignalError::InvalidSignal(99);
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: SignalError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_notifier_error_serialization() {
        let error = NotifierError::AlreadyRegistered(7);
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: NotifierError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_engine_error_display() {
        let error: EngineError = SignalError::InvalidSignal(0).into();
        assert_eq!(error.to_string(), "Signal error: Invalid signal number: 0");
    }

    #[test]
    fn test_engine_error_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let error: EngineError = io.into();
        assert!(matches!(error, EngineError::Io(_)));
    }
}
