//! Error types shared across the workspace.

use thiserror::Error;

/// A specialized `Result` type for Taskyard operations.
pub type TaskyardResult<T> = Result<T, TaskyardError>;

/// Workspace-level error type.
///
/// Library crates with richer failure modes (the broker) define their own
/// error enums and convert from this one at their boundary.
#[derive(Error, Debug)]
pub enum TaskyardError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Telemetry could not be initialized.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskyardError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }
}
