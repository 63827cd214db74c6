//! Error handling module for deskforge
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the application should use these types for consistency.
//!
//! Per-item failures during a provisioning run are NOT errors — they are
//! recorded as `Outcome::Failed` entries in the run report and the run
//! continues. Only precondition failures (wrong privilege level, broken
//! collaborator setup) surface through this type and abort the run.

use thiserror::Error;

/// Main error type for deskforge
#[derive(Error, Debug)]
pub enum DeskforgeError {
    /// IO errors (file operations, sysfs probes, config writes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Precondition failures that abort the run before any mutation
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// External command execution errors (spawn failure, timeout)
    #[error("Command error: {0}")]
    Command(String),

    /// Parse errors (store values, metadata responses, CLI input)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State errors (inconsistent persisted extension state)
    #[error("State error: {0}")]
    State(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for deskforge operations
pub type Result<T> = std::result::Result<T, DeskforgeError>;

// Convenient error constructors
impl DeskforgeError {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a command execution error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeskforgeError::precondition("must run as root");
        assert_eq!(err.to_string(), "Precondition failed: must run as root");

        let err = DeskforgeError::parse("bad store value");
        assert_eq!(err.to_string(), "Parse error: bad store value");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DeskforgeError = io_err.into();
        assert!(matches!(err, DeskforgeError::Io(_)));
    }

    #[test]
    fn test_error_constructors() {
        let err = DeskforgeError::command("apt-get not found");
        assert!(matches!(err, DeskforgeError::Command(_)));

        let err = DeskforgeError::state("id in both sets");
        assert!(matches!(err, DeskforgeError::State(_)));
    }
}
