//! Errors returned by plugin entry points

use std::fmt;

/// Error returned from a plugin's `Execute` entry point
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// The execution context was cancelled
    #[error("Execution cancelled")]
    Cancelled,

    /// The execution context deadline passed
    #[error("Execution deadline exceeded")]
    DeadlineExceeded,

    /// A value the plugin requires was not set on the context
    #[error("Missing context value: {0}")]
    MissingValue(String),

    /// Plugin-specific failure
    #[error("Execution failed: {0}")]
    Failed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type for plugin execution
pub type Result<T> = std::result::Result<T, ExecuteError>;

impl ExecuteError {
    /// Create a new failure error
    pub fn failed(msg: impl fmt::Display) -> Self {
        Self::Failed(msg.to_string())
    }

    /// Create a new missing value error
    pub fn missing_value(key: impl fmt::Display) -> Self {
        Self::MissingValue(key.to_string())
    }

    /// Whether the error came from context cancellation or deadline expiry
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
