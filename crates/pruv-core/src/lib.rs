//! # pruv Core
//!
//! Pure primitives for pruv: hash-linked chain entries, proofs, canonical
//! JSON and Ed25519 signatures.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! chain data.
//!
//! ## Key Types
//!
//! - [`Chain`] - Append-only ordered sequence of entries
//! - [`ChainEntry`] - One state transition: `x`, `y` and the `xy` proof
//! - [`EntryBuilder`] - Describes the next entry to append
//! - [`ChainVerification`] - Where (and why) a chain breaks
//!
//! ## Canonicalization
//!
//! State hashes and signed bytes use canonical JSON. See [`canonical`] module.

pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod types;

pub use canonical::{canonical_json, proof, state_hash};
pub use chain::{BreakDetail, BreakKind, Chain, ChainVerification, SignatureFailure};
pub use crypto::{sha256_hex, EntrySigner, Keypair, PublicKey, Signature};
pub use entry::{ChainEntry, EntryBuilder, SignatureStatus};
pub use error::CoreError;
pub use types::{generate_id, now_millis, GENESIS, STATUS_SUCCESS};
