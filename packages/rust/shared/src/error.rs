//! Error types for team registration.
//!
//! Library crates use [`TeamRegError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::Field;

/// Top-level error type for all registration operations.
#[derive(Debug, thiserror::Error)]
pub enum TeamRegError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Database or storage layer error. Treated as transient and retried.
    #[error("storage error: {0}")]
    Storage(String),

    /// A value is already used by another registration.
    #[error("{field} '{value}' is already registered by another team")]
    Conflict { field: Field, value: String },

    /// The record changed since it was loaded (a concurrent message won).
    #[error("registration {session_id} was modified concurrently")]
    StaleWrite { session_id: String },

    /// No registration exists for the session.
    #[error("no registration found for session {session_id}")]
    NotFound { session_id: String },

    /// Confirmation e-mail could not be sent.
    #[error("notification error: {0}")]
    Notification(String),

    /// Roster spreadsheet could not be updated.
    #[error("roster sync error: {0}")]
    RosterSync(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid admin edit, malformed document, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TeamRegError>;

impl TeamRegError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a conflict error for a field value.
    pub fn conflict(field: Field, value: impl Into<String>) -> Self {
        Self::Conflict {
            field,
            value: value.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
