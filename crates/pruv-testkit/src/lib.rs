//! # pruv Testkit
//!
//! Testing utilities for pruv.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known entries with expected state hashes and proofs
//! - **Generators**: Proptest strategies for scopes, actions, states and chains
//! - **Fixtures**: A fake [`AgentResolver`](pruv_identity::AgentResolver), an
//!   identity fixture, and a tracing setup for tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use pruv_testkit::vectors::{golden_chain, verify_all_vectors};
//!
//! verify_all_vectors().unwrap();
//! assert!(golden_chain().verify().valid);
//! ```
//!
//! ## Fake Resolver
//!
//! ```rust
//! use pruv_testkit::StaticResolver;
//!
//! let resolver = StaticResolver::new();
//! resolver.insert(StaticResolver::authorized("agent_a", "alice"));
//! resolver.update("agent_a", |s| s.active = false);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    init_test_tracing, reader_request, FailingResolver, IdentityFixture, StaticResolver,
};
pub use generators::{keypair, scope_and_actions, PlannedAction};
pub use vectors::{all_vectors, golden_chain, verify_all_vectors, GoldenVector};
