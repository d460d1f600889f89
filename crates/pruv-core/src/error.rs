//! Error types for pruv core.

use thiserror::Error;

/// Errors raised by entry encoding and signature checks.
///
/// Chain tampering is not represented here: a broken chain is a verification
/// result, not an error.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("entry carries a signature but no public key")]
    MissingPublicKey,

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}
