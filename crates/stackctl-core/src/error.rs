//! Error types for stackctl

use thiserror::Error;

/// Main error type for stackctl
#[derive(Error, Debug)]
pub enum StackError {
    /// A required collaborator tool is missing or unreachable
    #[error("Prerequisite error: {0}")]
    Prerequisite(String),

    /// Rate limit, timeout or temporary unavailability; safe to retry
    #[error("Transient error: {0}")]
    Transient(String),

    /// Permission denied, invalid manifest, conflict; never retried
    #[error("Operation failed: {0}")]
    Operation(String),

    /// A readiness probe ran out of time
    #[error("Readiness timeout: {0}")]
    ReadinessTimeout(String),

    /// The operator declined a destructive action
    #[error("Confirmation declined")]
    ConfirmationDeclined,

    /// Unknown deployment type for the selected command
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StackError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StackError::Transient(_))
    }
}

/// Result type for stackctl operations
pub type StackResult<T> = Result<T, StackError>;

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for StackError {
    fn from(err: toml::de::Error) -> Self {
        StackError::Config(err.to_string())
    }
}
