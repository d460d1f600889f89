//! # pruv Provenance
//!
//! Artifacts with an origin and a modification history. Each transition
//! records who made it, and verification re-derives whether that agent is
//! still trustworthy from the agent's own identity chain at call time.
//!
//! ## Key Types
//!
//! - [`ProvenanceService`] - origin, transition, verify, history
//! - [`Artifact`] - Stored metadata for one artifact
//! - [`Content`] - Bytes, text or JSON; hashed and discarded
//! - [`ProvenanceVerificationResult`] - Integrity, threading, authorization

pub mod artifact;
pub mod content;
pub mod error;
pub mod payload;
pub mod service;
pub mod verification;

pub use artifact::{Artifact, OriginRequest, Transition};
pub use content::Content;
pub use error::{ProvenanceError, Result};
pub use payload::{OriginRecord, ProvenancePayload, TransitionInput, TransitionRecord};
pub use service::ProvenanceService;
pub use verification::{
    verify_record, ProvenanceVerificationResult, ThreadBreak, TransitionCheck,
    UnauthorizedReason, UnauthorizedTransition,
};
