//! Verification receipts.
//!
//! A receipt is a self-contained envelope around one verification: the
//! chain's head hashes, a domain-specific `product_data` block and a
//! deterministic narrative. Broken and unauthorized chains still get a
//! complete receipt; only its content changes.

use pruv_core::Chain;
use pruv_identity::{AgentIdentity, IdentityStatus, OutOfScopeAction, VerificationResult};
use pruv_provenance::{
    Artifact, ProvenanceVerificationResult, ThreadBreak, TransitionCheck, UnauthorizedTransition,
};
use pruv_registry::Record;
use serde::{Deserialize, Serialize};

use crate::narrative::{identity_narrative, provenance_narrative};

/// Receipt format version.
pub const PRUV_VERSION: &str = "1.0";

/// Which domain a receipt describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptType {
    Identity,
    Provenance,
}

/// The receipt envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptEnvelope {
    pub pruv_version: String,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    pub chain_id: String,
    pub chain_intact: bool,
    pub entries: usize,
    /// `"<verified_count>/<entries>"`.
    pub verified: String,
    /// `x` of the last entry.
    #[serde(rename = "X")]
    pub x: String,
    /// `y` of the last entry.
    #[serde(rename = "Y")]
    pub y: String,
    /// `xy` of the last entry.
    #[serde(rename = "XY")]
    pub xy: String,
    /// Signature of the last entry, if it was signed.
    pub signature: Option<String>,
    /// When the receipt was generated, Unix milliseconds.
    pub timestamp: i64,
    pub product_data: ProductData,
    pub human_readable: String,
}

impl ReceiptEnvelope {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Domain-specific receipt body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductData {
    Identity(IdentityProductData),
    Provenance(ProvenanceProductData),
}

/// Declared identity fields, scope statistics and out-of-scope actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProductData {
    pub agent_id: String,
    pub name: String,
    pub framework: String,
    pub owner: String,
    pub scope: Vec<String>,
    pub purpose: String,
    pub valid_from: i64,
    pub valid_until: Option<i64>,
    pub status: IdentityStatus,
    pub active: bool,
    pub revoked_at: Option<i64>,
    pub revocation_reason: Option<String>,
    pub action_count: usize,
    pub in_scope_count: usize,
    pub out_of_scope_count: usize,
    pub out_of_scope_actions: Vec<OutOfScopeAction>,
    pub break_at: Option<usize>,
    pub signatures_valid: bool,
}

/// Artifact fields, the transition timeline and unauthorized transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceProductData {
    pub artifact_id: String,
    pub name: String,
    pub classification: String,
    pub owner: String,
    pub origin_hash: String,
    pub current_state_hash: String,
    pub valid: bool,
    pub authorized: bool,
    pub origin_verified: bool,
    pub current_state_verified: bool,
    pub transition_count: usize,
    pub transitions: Vec<TransitionCheck>,
    pub thread_breaks: Vec<ThreadBreak>,
    pub unauthorized_transitions: Vec<UnauthorizedTransition>,
    pub break_at: Option<usize>,
    pub break_at_agent: Option<String>,
    /// Entry indices of transitions at or after the break.
    pub untrusted_entries: Vec<u64>,
    pub signatures_valid: bool,
}

struct Head {
    x: String,
    y: String,
    xy: String,
    signature: Option<String>,
}

fn head(chain: &Chain) -> Head {
    match chain.last() {
        Some(entry) => Head {
            x: entry.x.clone(),
            y: entry.y.clone(),
            xy: entry.xy.clone(),
            signature: entry.signature.clone(),
        },
        None => Head {
            x: String::new(),
            y: String::new(),
            xy: String::new(),
            signature: None,
        },
    }
}

/// Build the receipt for an agent from its record and verification.
pub fn identity_receipt(
    record: &Record<AgentIdentity>,
    result: &VerificationResult,
    generated_at: i64,
) -> ReceiptEnvelope {
    let identity = &record.metadata;
    let head = head(&record.chain);

    let product_data = ProductData::Identity(IdentityProductData {
        agent_id: identity.id.clone(),
        name: identity.name.clone(),
        framework: identity.framework.clone(),
        owner: identity.owner.clone(),
        scope: identity.scope.clone(),
        purpose: identity.purpose.clone(),
        valid_from: identity.valid_from,
        valid_until: identity.valid_until,
        status: result.status,
        active: result.active,
        revoked_at: identity.revoked_at,
        revocation_reason: identity.revocation_reason.clone(),
        action_count: result.action_count,
        in_scope_count: result.in_scope_count,
        out_of_scope_count: result.out_of_scope_actions.len(),
        out_of_scope_actions: result.out_of_scope_actions.clone(),
        break_at: result.break_at,
        signatures_valid: result.signatures_valid,
    });

    ReceiptEnvelope {
        pruv_version: PRUV_VERSION.to_string(),
        receipt_type: ReceiptType::Identity,
        chain_id: identity.chain_id.clone(),
        chain_intact: result.intact,
        entries: result.entries,
        verified: format!("{}/{}", result.verified_count, result.entries),
        x: head.x,
        y: head.y,
        xy: head.xy,
        signature: head.signature,
        timestamp: generated_at,
        product_data,
        human_readable: identity_narrative(record, result),
    }
}

/// Build the receipt for an artifact from its record and verification.
pub fn provenance_receipt(
    record: &Record<Artifact>,
    result: &ProvenanceVerificationResult,
    generated_at: i64,
) -> ReceiptEnvelope {
    let artifact = &record.metadata;
    let head = head(&record.chain);

    let product_data = ProductData::Provenance(ProvenanceProductData {
        artifact_id: artifact.id.clone(),
        name: artifact.name.clone(),
        classification: artifact.classification.clone(),
        owner: artifact.owner.clone(),
        origin_hash: artifact.origin_hash.clone(),
        current_state_hash: artifact.current_state_hash.clone(),
        valid: result.valid,
        authorized: result.authorized(),
        origin_verified: result.origin_verified,
        current_state_verified: result.current_state_verified,
        transition_count: result.transition_count,
        transitions: result.transitions.clone(),
        thread_breaks: result.thread_breaks.clone(),
        unauthorized_transitions: result.unauthorized_transitions.clone(),
        break_at: result.break_at,
        break_at_agent: result.break_at_agent.clone(),
        untrusted_entries: result
            .untrusted_transitions()
            .iter()
            .map(|t| t.entry_index)
            .collect(),
        signatures_valid: result.signatures_valid,
    });

    ReceiptEnvelope {
        pruv_version: PRUV_VERSION.to_string(),
        receipt_type: ReceiptType::Provenance,
        chain_id: artifact.chain_id.clone(),
        chain_intact: result.intact,
        entries: result.entries,
        verified: format!("{}/{}", result.verified_count, result.entries),
        x: head.x,
        y: head.y,
        xy: head.xy,
        signature: head.signature,
        timestamp: generated_at,
        product_data,
        human_readable: provenance_narrative(record, result),
    }
}
