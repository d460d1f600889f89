//! Error types for the identity domain.

use std::time::Duration;

use pruv_core::CoreError;
use pruv_registry::RegistryError;
use thiserror::Error;

/// Errors returned by identity operations.
///
/// A tampered chain is not an error: `verify` reports it as a result.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("agent not found: {0}")]
    NotFound(String),

    #[error("agent already revoked: {0}")]
    AlreadyRevoked(String),

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

impl From<RegistryError> for IdentityError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Timeout { after, .. } => IdentityError::Timeout(after),
            RegistryError::Serialization(msg) => IdentityError::Serialization(msg),
            other => IdentityError::Storage(other),
        }
    }
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
