//! The append-only hash chain and its verification.
//!
//! A chain is an ordered list of [`ChainEntry`] values where every entry's `x`
//! equals the previous entry's `y` (or `GENESIS`), every `xy` proof can be
//! recomputed from the entry's own fields, and every `y` is the hash of the
//! entry's `y_state`. Verification walks the entries once and reports the
//! first index where a check fails.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::entry::{ChainEntry, EntryBuilder};
use crate::types::GENESIS;

/// An ordered sequence of entries, serialized as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    entries: Vec<ChainEntry>,
}

/// Which check failed at the break index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    /// `entries[i].index != i`.
    Index,
    /// `entries[i].x` does not match the predecessor's `y` (or `GENESIS`).
    Link,
    /// The stored `xy` does not match a recomputation.
    Proof,
    /// `y` is not the hash of the stored `y_state`.
    State,
}

impl BreakKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakKind::Index => "index",
            BreakKind::Link => "link",
            BreakKind::Proof => "proof",
            BreakKind::State => "state",
        }
    }
}

/// Result of walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    /// True when every entry passed every check.
    pub valid: bool,
    /// First failing position.
    pub break_index: Option<usize>,
    /// Entries verified before the break (all of them when intact).
    pub verified_count: usize,
    pub failure: Option<BreakKind>,
}

/// What the verifier expected and found at the break index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakDetail {
    pub index: usize,
    /// The predecessor's `y`, or `GENESIS` at index 0.
    pub expected_x: String,
    pub found_x: String,
    pub entry_timestamp: i64,
    pub failure: BreakKind,
}

/// A signature that did not verify, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureFailure {
    pub index: u64,
    pub reason: String,
}

impl Chain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries loaded from storage. No checks are made; call
    /// [`Chain::verify`] to find out whether they hold together.
    pub fn from_entries(entries: Vec<ChainEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ChainEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChainEntry> {
        self.entries.get(index)
    }

    pub fn first(&self) -> Option<&ChainEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&ChainEntry> {
        self.entries.last()
    }

    /// The last entry's `y`, or `GENESIS` for an empty chain.
    pub fn head(&self) -> &str {
        self.entries.last().map(|e| e.y.as_str()).unwrap_or(GENESIS)
    }

    /// Append a new entry linked to the current head.
    ///
    /// Persistence is the caller's job.
    pub fn append(&mut self, builder: EntryBuilder) -> &ChainEntry {
        let index = self.entries.len() as u64;
        let entry = builder.build(index, self.head().to_string());
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Walk the chain and report the first broken index.
    ///
    /// Checks, in order, per entry: the index, the link to the predecessor,
    /// the proof, and the output state against `y`.
    pub fn verify(&self) -> ChainVerification {
        let mut expected_x = GENESIS;

        for (i, entry) in self.entries.iter().enumerate() {
            let failure = if entry.index != i as u64 {
                Some(BreakKind::Index)
            } else if entry.x != expected_x {
                Some(BreakKind::Link)
            } else if !entry.has_valid_proof() {
                Some(BreakKind::Proof)
            } else if !entry.has_valid_state() {
                Some(BreakKind::State)
            } else {
                None
            };

            if let Some(kind) = failure {
                return ChainVerification {
                    valid: false,
                    break_index: Some(i),
                    verified_count: i,
                    failure: Some(kind),
                };
            }

            expected_x = entry.y.as_str();
        }

        ChainVerification {
            valid: true,
            break_index: None,
            verified_count: self.entries.len(),
            failure: None,
        }
    }

    /// Describe the break reported by `verification`, if any.
    pub fn break_detail(&self, verification: &ChainVerification) -> Option<BreakDetail> {
        let index = verification.break_index?;
        let failure = verification.failure?;
        let entry = self.entries.get(index)?;
        let expected_x = match index {
            0 => GENESIS.to_string(),
            i => self.entries[i - 1].y.clone(),
        };

        Some(BreakDetail {
            index,
            expected_x,
            found_x: entry.x.clone(),
            entry_timestamp: entry.timestamp,
            failure,
        })
    }

    /// Check every signed entry. Unsigned entries are skipped.
    pub fn verify_signatures(&self) -> Vec<SignatureFailure> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry.verify_signature().err().map(|e| SignatureFailure {
                    index: entry.index,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Decode every entry's `y_state` as `T`.
    ///
    /// Entries whose state does not decode yield `None`.
    pub fn decode_payloads<'a, T: DeserializeOwned + 'a>(
        &'a self,
    ) -> impl Iterator<Item = (&'a ChainEntry, Option<T>)> + 'a {
        self.entries.iter().map(|entry| (entry, entry.payload()))
    }
}
