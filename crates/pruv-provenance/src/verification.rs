//! Provenance verification.
//!
//! Three independent checks run over one loaded record:
//!
//! 1. Origin: the genesis payload's content hash matches `origin_hash`.
//! 2. Threading: each transition's `previous_hash` continues from the one
//!    before it, starting at `origin_hash`.
//! 3. Authorization: every transition's agent is re-resolved now. Nothing
//!    recorded at transition time is trusted for this.
//!
//! Integrity (`valid`) and authorization (`authorized()`) are reported
//! separately: a chain can be intact while every transition in it is
//! unauthorized.

use std::collections::HashMap;

use pruv_core::{BreakDetail, SignatureFailure};
use pruv_identity::{AgentResolver, AgentSnapshot};
use pruv_registry::Record;
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::payload::ProvenancePayload;

/// Why a transition is no longer authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedReason {
    AgentNotFound,
    ChainBroken,
    Inactive,
    OutOfScope,
    ResolutionFailed,
}

impl UnauthorizedReason {
    /// The first failing condition of a snapshot, if any.
    pub fn of(snapshot: &AgentSnapshot) -> Option<Self> {
        if !snapshot.exists {
            Some(UnauthorizedReason::AgentNotFound)
        } else if !snapshot.intact {
            Some(UnauthorizedReason::ChainBroken)
        } else if !snapshot.active {
            Some(UnauthorizedReason::Inactive)
        } else if !snapshot.in_scope {
            Some(UnauthorizedReason::OutOfScope)
        } else {
            None
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            UnauthorizedReason::AgentNotFound => "agent no longer exists",
            UnauthorizedReason::ChainBroken => "agent chain is not intact",
            UnauthorizedReason::Inactive => "agent is revoked or outside its validity window",
            UnauthorizedReason::OutOfScope => "agent has acted outside its declared scope",
            UnauthorizedReason::ResolutionFailed => "agent could not be resolved",
        }
    }
}

/// A transition whose `previous_hash` does not continue the thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadBreak {
    pub entry_index: u64,
    pub transition_number: u64,
    pub expected_previous_hash: String,
    pub found_previous_hash: String,
}

/// A transition whose agent fails live re-verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnauthorizedTransition {
    pub entry_index: u64,
    pub transition_number: u64,
    pub agent_id: String,
    pub reason: UnauthorizedReason,
}

/// One transition as seen by the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCheck {
    pub entry_index: u64,
    pub transition_number: u64,
    pub agent_id: String,
    pub agent_name: String,
    pub reason: String,
    pub content_hash: String,
    pub timestamp: i64,
    pub threaded: bool,
    pub authorized: bool,
}

/// Result of verifying one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceVerificationResult {
    pub artifact_id: String,
    /// Every entry passed the index, link and proof checks.
    pub intact: bool,
    /// Intact, origin verified, no thread breaks, current state verified.
    pub valid: bool,
    pub entries: usize,
    pub verified_count: usize,
    pub origin_verified: bool,
    /// The last threaded hash equals the stored `current_state_hash`.
    pub current_state_verified: bool,
    pub transition_count: usize,
    pub transitions: Vec<TransitionCheck>,
    pub thread_breaks: Vec<ThreadBreak>,
    pub break_at: Option<usize>,
    /// Agent of the transition entry at `break_at`.
    pub break_at_agent: Option<String>,
    pub break_detail: Option<BreakDetail>,
    pub unauthorized_transitions: Vec<UnauthorizedTransition>,
    pub signatures_valid: bool,
    pub signature_failures: Vec<SignatureFailure>,
}

impl ProvenanceVerificationResult {
    /// No transition failed live re-verification.
    pub fn authorized(&self) -> bool {
        self.unauthorized_transitions.is_empty()
    }

    /// Transitions recorded at or after the break, which can no longer be
    /// trusted.
    pub fn untrusted_transitions(&self) -> Vec<&TransitionCheck> {
        match self.break_at {
            Some(at) => self
                .transitions
                .iter()
                .filter(|t| t.entry_index as usize >= at)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Verify a loaded artifact record, resolving agents through `resolver`.
///
/// Each distinct agent is resolved once per call.
pub async fn verify_record(
    record: &Record<Artifact>,
    resolver: &dyn AgentResolver,
) -> ProvenanceVerificationResult {
    let artifact = &record.metadata;
    let chain = &record.chain;

    let verification = chain.verify();
    let break_detail = chain.break_detail(&verification);
    let signature_failures = chain.verify_signatures();
    let payloads: Vec<_> = chain.decode_payloads::<ProvenancePayload>().collect();

    let origin_verified = payloads
        .first()
        .and_then(|(_, payload)| payload.as_ref())
        .and_then(ProvenancePayload::as_origin)
        .map_or(false, |origin| origin.content_hash == artifact.origin_hash);

    let mut expected_hash = artifact.origin_hash.clone();
    let mut thread_breaks = Vec::new();
    let mut transitions = Vec::new();
    let mut unauthorized_transitions = Vec::new();
    let mut snapshots: HashMap<String, Option<AgentSnapshot>> = HashMap::new();

    for (entry, payload) in &payloads {
        let Some(ProvenancePayload::Transition(t)) = payload else {
            continue;
        };

        let threaded = t.previous_hash == expected_hash;
        if !threaded {
            thread_breaks.push(ThreadBreak {
                entry_index: entry.index,
                transition_number: t.transition_number,
                expected_previous_hash: expected_hash.clone(),
                found_previous_hash: t.previous_hash.clone(),
            });
        }
        expected_hash = t.content_hash.clone();

        if !snapshots.contains_key(&t.agent_id) {
            let resolved = match resolver.resolve_agent(&t.agent_id).await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!(
                        agent_id = %t.agent_id,
                        error = %e,
                        "agent resolution failed during verification"
                    );
                    None
                }
            };
            snapshots.insert(t.agent_id.clone(), resolved);
        }

        let unauthorized = match snapshots.get(&t.agent_id) {
            Some(Some(snapshot)) => UnauthorizedReason::of(snapshot),
            _ => Some(UnauthorizedReason::ResolutionFailed),
        };
        if let Some(reason) = unauthorized {
            unauthorized_transitions.push(UnauthorizedTransition {
                entry_index: entry.index,
                transition_number: t.transition_number,
                agent_id: t.agent_id.clone(),
                reason,
            });
        }

        transitions.push(TransitionCheck {
            entry_index: entry.index,
            transition_number: t.transition_number,
            agent_id: t.agent_id.clone(),
            agent_name: t.agent_name.clone(),
            reason: t.reason.clone(),
            content_hash: t.content_hash.clone(),
            timestamp: t.timestamp,
            threaded,
            authorized: unauthorized.is_none(),
        });
    }

    let current_state_verified = expected_hash == artifact.current_state_hash;

    let break_at_agent = verification.break_index.and_then(|at| {
        payloads
            .get(at)
            .and_then(|(_, payload)| payload.as_ref())
            .and_then(ProvenancePayload::as_transition)
            .map(|t| t.agent_id.clone())
    });

    let intact = verification.valid;
    let valid = intact && origin_verified && thread_breaks.is_empty() && current_state_verified;

    ProvenanceVerificationResult {
        artifact_id: artifact.id.clone(),
        intact,
        valid,
        entries: chain.len(),
        verified_count: verification.verified_count,
        origin_verified,
        current_state_verified,
        transition_count: transitions.len(),
        transitions,
        thread_breaks,
        break_at: verification.break_index,
        break_at_agent,
        break_detail,
        unauthorized_transitions,
        signatures_valid: signature_failures.is_empty(),
        signature_failures,
    }
}
