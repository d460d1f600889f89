//! # pruv
//!
//! The unified API for pruv: hash-chained records of what agents did and
//! how artifacts changed, verifiable later by anyone holding the chain.
//!
//! ## Overview
//!
//! - **Identity**: Agents declare a capability scope; every action is
//!   recorded with whether it fell inside that scope
//! - **Provenance**: Artifacts record an origin and each transition, and
//!   transitions are re-authorized live against the acting agent's chain
//! - **Receipts**: Any verification can be rendered into a JSON envelope
//!   with a deterministic human-readable narrative
//!
//! ## Key Concepts
//!
//! - **Chain**: Append-only entries, each binding input state, operation,
//!   output state and timestamp into a proof `xy`
//! - **Break index**: The first entry whose index, link or proof fails
//! - **Intact vs authorized**: A chain can be perfectly intact while every
//!   transition in it is unauthorized
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pruv::{OriginRequest, Pruv, PruvConfig, RegisterRequest};
//!
//! async fn example() -> pruv::Result<()> {
//!     let pruv = Pruv::open(PruvConfig::from_env()?)?;
//!
//!     let agent = pruv
//!         .register(RegisterRequest::new("reader", "ops", ["file.read"]))
//!         .await?;
//!     pruv.act(&agent.id, "read_report", "file.read", None).await?;
//!
//!     let report = pruv
//!         .origin(OriginRequest::new("v1", "report.md", "ops"))
//!         .await?;
//!     pruv.transition(&report.id, "v2", &agent.id, "typo fix", None).await?;
//!
//!     let receipt = pruv.provenance_receipt(&report.id).await?;
//!     println!("{}", receipt.human_readable);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `pruv::core` - Chain primitives
//! - `pruv::registry` - Storage abstraction, SQLite and memory backends
//! - `pruv::identity` - Identity domain
//! - `pruv::provenance` - Provenance domain

pub mod config;
pub mod error;
pub mod facade;
pub mod narrative;
pub mod receipt;

pub use pruv_core as core;
pub use pruv_identity as identity;
pub use pruv_provenance as provenance;
pub use pruv_registry as registry;

pub use config::PruvConfig;
pub use error::{PruvError, Result};
pub use facade::Pruv;
pub use receipt::{
    IdentityProductData, ProductData, ProvenanceProductData, ReceiptEnvelope, ReceiptType,
    PRUV_VERSION,
};

pub use pruv_core::{Chain, ChainEntry, EntrySigner, Keypair};
pub use pruv_identity::{AgentIdentity, IdentityAction, RegisterRequest, VerificationResult};
pub use pruv_provenance::{
    Artifact, Content, OriginRequest, ProvenanceVerificationResult, Transition,
};
