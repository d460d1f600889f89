//! Error types for the provenance domain.

use std::time::Duration;

use pruv_core::CoreError;
use pruv_registry::RegistryError;
use thiserror::Error;

/// Errors returned by provenance operations.
///
/// Broken chains and unauthorized transitions are verification results,
/// not errors.
#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Underlying registry failure. Callers may retry.
    #[error("storage error: {0}")]
    Storage(RegistryError),

    /// A registry call exceeded its I/O bound. Callers may retry.
    #[error("registry call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<RegistryError> for ProvenanceError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Timeout { after, .. } => ProvenanceError::Timeout(after),
            RegistryError::Serialization(msg) => ProvenanceError::Serialization(msg),
            other => ProvenanceError::Storage(other),
        }
    }
}

/// Result type for provenance operations.
pub type Result<T> = std::result::Result<T, ProvenanceError>;
