//! Error types for the registry module.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Database error, converted to a string at the boundary.
    #[error("database error: {0}")]
    Database(String),

    /// Metadata or chain serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored chain length did not match what the writer expected.
    ///
    /// `None` means "no record".
    #[error("conflict on {id}: expected chain length {expected:?}, found {found:?}")]
    Conflict {
        id: String,
        expected: Option<usize>,
        found: Option<usize>,
    },

    /// A registry call exceeded its I/O bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    TaskFailed(String),
}

impl From<rusqlite::Error> for RegistryError {
    fn from(e: rusqlite::Error) -> Self {
        RegistryError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
