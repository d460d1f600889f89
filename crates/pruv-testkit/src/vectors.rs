//! Golden test vectors for deterministic verification.
//!
//! Each vector is one chain entry with a pinned timestamp. Applied in order
//! they form a chain, so every vector's `x` is the previous vector's `y`.
//! The expected hashes were computed independently of this codebase.

use pruv_core::{proof, state_hash, Chain, EntryBuilder, GENESIS};
use serde_json::Value;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub operation: &'static str,
    /// Output state as JSON text, or `None` for an absent state.
    pub y_state: Option<&'static str>,
    pub timestamp: i64,
    /// Expected state hash (hex).
    pub expected_y: &'static str,
    /// Expected proof.
    pub expected_xy: &'static str,
}

impl GoldenVector {
    pub fn state(&self) -> Option<Value> {
        self.y_state.and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Get all golden test vectors, in chain order.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "registration genesis",
            operation: "register",
            y_state: Some(r#"{"scope":["file.read"],"name":"reader","event":"registration"}"#),
            timestamp: 1736870400000, // 2025-01-14T16:00:00Z
            expected_y: "485460f1e325811129b4fc32135920f7732956a52ff511ddfe769392229cefb0",
            expected_xy: "xy_a62ce44280af339b6a2d30130f9f10d669d145d377bb63b0b922771b5c0f8455",
        },
        GoldenVector {
            name: "in-scope action",
            operation: "read_report",
            y_state: Some(
                r#"{"event":"action","action":"read_report","action_scope":"file.read","in_scope":true,"action_count":1}"#,
            ),
            timestamp: 1736870400001,
            expected_y: "108953560a93de6450165d4f2b0cb031742983ed0361707f523f54a90c8a7c5e",
            expected_xy: "xy_36089cbdba6ab028c318d9f297e7858c5612bee67f115fb694829b98a405c79c",
        },
        GoldenVector {
            name: "non-ascii and escaped text",
            operation: "annotate",
            y_state: Some(r#"{"tab":"a\tb","note":"naïve café ✓"}"#),
            timestamp: 1736870400002,
            expected_y: "b1d57827e8234502f7742d5a0f932ca7529baff5dced09eaa52ad6673924fc72",
            expected_xy: "xy_0bffa5ef425ec12e67c5a6d3a189d7e2aedd55819a8e9c7287eaf7c5838796fd",
        },
    ]
}

/// The empty-state vector: `register` over no state at the genesis position.
pub const EMPTY_STATE_HASH: &str =
    "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

/// Proof of `register` over the empty state at timestamp 1736870400000.
pub const EMPTY_GENESIS_PROOF: &str =
    "xy_4e96f3314509d095fac4faab5e1ad38ede05f2f6334083a5d6a56215319c894a";

/// Build a chain from all vectors.
pub fn golden_chain() -> Chain {
    let mut chain = Chain::new();
    for vector in all_vectors() {
        let mut builder = EntryBuilder::new(vector.operation).timestamp(vector.timestamp);
        if let Some(state) = vector.state() {
            builder = builder.y_state(state);
        }
        chain.append(builder);
    }
    chain
}

/// Verify all golden vectors, returning the name and reason of the first
/// mismatch.
pub fn verify_all_vectors() -> Result<(), String> {
    let mut x = GENESIS.to_string();

    for vector in all_vectors() {
        let y = state_hash(vector.state().as_ref());
        if y != vector.expected_y {
            return Err(format!(
                "{}: state hash {} != expected {}",
                vector.name, y, vector.expected_y
            ));
        }

        let xy = proof(&x, vector.operation, &y, vector.timestamp);
        if xy != vector.expected_xy {
            return Err(format!(
                "{}: proof {} != expected {}",
                vector.name, xy, vector.expected_xy
            ));
        }

        x = y;
    }

    let empty = state_hash(None);
    if empty != EMPTY_STATE_HASH {
        return Err(format!("empty state: {} != {}", empty, EMPTY_STATE_HASH));
    }
    let genesis = proof(GENESIS, "register", &empty, 1736870400000);
    if genesis != EMPTY_GENESIS_PROOF {
        return Err(format!("empty genesis: {} != {}", genesis, EMPTY_GENESIS_PROOF));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_verify() {
        verify_all_vectors().unwrap();
    }

    #[test]
    fn test_vectors_parse() {
        for vector in all_vectors() {
            assert!(vector.state().is_some(), "{} does not parse", vector.name);
        }
    }

    #[test]
    fn test_golden_chain_matches_vectors() {
        let chain = golden_chain();
        let vectors = all_vectors();
        assert_eq!(chain.len(), vectors.len());
        assert!(chain.verify().valid);

        for (entry, vector) in chain.entries().iter().zip(&vectors) {
            assert_eq!(entry.y, vector.expected_y, "{}", vector.name);
            assert_eq!(entry.xy, vector.expected_xy, "{}", vector.name);
        }
    }
}
