//! Error types for jobplanner.
//!
//! Library crates use [`JobPlannerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all jobplanner operations.
#[derive(Debug, thiserror::Error)]
pub enum JobPlannerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to an external service.
    #[error("network error: {0}")]
    Network(String),

    /// Reply text could not be decoded into the expected structure.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// External collaborator (scoring or narrative service) failure.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Caller-supplied data is invalid (duplicate candidate indices, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Internal invariant broken during a run. Never recovered silently.
    #[error("data consistency error: {message}")]
    DataConsistency { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, JobPlannerError>;

impl JobPlannerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a data-consistency error from any displayable message.
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::DataConsistency {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
