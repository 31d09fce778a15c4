//! Error types for session-guard operations.
//!
//! The state machine itself has no fallible transitions. Errors only come
//! from configuration (validation, loading) and the process boundary.

use std::path::PathBuf;

/// All errors that can occur in session-guard operations.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using GuardError.
pub type Result<T> = std::result::Result<T, GuardError>;

impl From<GuardError> for String {
    fn from(err: GuardError) -> String {
        err.to_string()
    }
}
