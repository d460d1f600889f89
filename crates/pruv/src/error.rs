//! Error types for the facade.

use pruv_identity::IdentityError;
use pruv_provenance::ProvenanceError;
use pruv_registry::RegistryError;
use thiserror::Error;

/// Errors that can occur during pruv operations.
#[derive(Debug, Error)]
pub enum PruvError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Provenance(#[from] ProvenanceError),

    /// Opening or migrating a registry failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PruvError {
    /// The operation referenced an unknown agent or artifact.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PruvError::Identity(IdentityError::NotFound(_))
                | PruvError::Provenance(ProvenanceError::NotFound(_))
        )
    }

    /// Storage failures and timeouts, which callers may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PruvError::Identity(IdentityError::Storage(_) | IdentityError::Timeout(_))
                | PruvError::Provenance(ProvenanceError::Storage(_) | ProvenanceError::Timeout(_))
                | PruvError::Registry(_)
        )
    }
}

/// Result type for pruv operations.
pub type Result<T> = std::result::Result<T, PruvError>;
