//! # pruv Identity
//!
//! Agents with a declared capability scope. Every action an agent takes is
//! appended to its chain together with whether it fell inside that scope.
//! Scope is recorded, never enforced.
//!
//! ## Lifecycle
//!
//! `register` creates the chain, `act` appends to it, `revoke` appends a
//! terminal entry and flips the stored status. Nothing is ever deleted.
//!
//! ## Key Types
//!
//! - [`IdentityService`] - register, act, verify, revoke, history
//! - [`AgentIdentity`] - Stored metadata for one agent
//! - [`VerificationResult`] - Chain integrity, scope statistics, validity
//! - [`AgentResolver`] - Read-only lookup used by other domains

pub mod error;
pub mod identity;
pub mod payload;
pub mod resolver;
pub mod service;
pub mod verification;

pub use error::{IdentityError, Result};
pub use identity::{AgentIdentity, IdentityAction, IdentityStatus, RegisterRequest};
pub use payload::{ActionInput, ActionRecord, IdentityPayload, Registration, Revocation};
pub use resolver::{AgentResolver, AgentSnapshot};
pub use service::IdentityService;
pub use verification::{verify_record, OutOfScopeAction, VerificationResult};
