//! Identity verification results.
//!
//! Verification is a pure function of a stored record and the current time,
//! so two calls with no writes in between agree exactly.

use pruv_core::{BreakDetail, SignatureFailure};
use pruv_registry::Record;
use serde::{Deserialize, Serialize};

use crate::identity::{AgentIdentity, IdentityStatus};
use crate::payload::IdentityPayload;

/// An action recorded outside the declared scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfScopeAction {
    pub entry_index: u64,
    pub action: String,
    pub action_scope: String,
    pub timestamp: i64,
}

/// Result of verifying one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub agent_id: String,
    /// Every entry passed the index, link and proof checks.
    pub intact: bool,
    /// Not revoked and inside the validity window.
    pub active: bool,
    pub status: IdentityStatus,
    pub entries: usize,
    pub verified_count: usize,
    pub action_count: usize,
    pub in_scope_count: usize,
    pub out_of_scope_actions: Vec<OutOfScopeAction>,
    pub break_at: Option<usize>,
    pub break_detail: Option<BreakDetail>,
    pub signatures_valid: bool,
    pub signature_failures: Vec<SignatureFailure>,
}

impl VerificationResult {
    /// Intact, active, every action in scope and every signature valid.
    pub fn is_trustworthy(&self) -> bool {
        self.intact && self.active && self.out_of_scope_actions.is_empty() && self.signatures_valid
    }
}

/// Verify a loaded identity record at time `now`.
pub fn verify_record(record: &Record<AgentIdentity>, now: i64) -> VerificationResult {
    let identity = &record.metadata;
    let chain = &record.chain;

    let verification = chain.verify();
    let break_detail = chain.break_detail(&verification);
    let signature_failures = chain.verify_signatures();

    let mut action_count = 0;
    let mut in_scope_count = 0;
    let mut out_of_scope_actions = Vec::new();

    for (entry, payload) in chain.decode_payloads::<IdentityPayload>() {
        let Some(IdentityPayload::Action(action)) = payload else {
            continue;
        };
        action_count += 1;
        if action.in_scope {
            in_scope_count += 1;
        } else {
            out_of_scope_actions.push(OutOfScopeAction {
                entry_index: entry.index,
                action: action.action,
                action_scope: action.action_scope,
                timestamp: action.timestamp,
            });
        }
    }

    VerificationResult {
        agent_id: identity.id.clone(),
        intact: verification.valid,
        active: identity.is_active_at(now),
        status: identity.status,
        entries: chain.len(),
        verified_count: verification.verified_count,
        action_count,
        in_scope_count,
        out_of_scope_actions,
        break_at: verification.break_index,
        break_detail,
        signatures_valid: signature_failures.is_empty(),
        signature_failures,
    }
}
