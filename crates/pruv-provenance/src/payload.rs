//! Provenance chain payloads, discriminated by `event`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `y_state` of a provenance chain entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ProvenancePayload {
    Origin(OriginRecord),
    Transition(TransitionRecord),
}

/// Genesis payload: where the artifact came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginRecord {
    pub artifact_id: String,
    pub name: String,
    pub classification: String,
    pub owner: String,
    pub content_hash: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub timestamp: i64,
}

/// One modification, with the agent's state denormalized at record time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub content_hash: String,
    pub previous_hash: String,
    /// 1-based.
    pub transition_number: u64,
    pub agent_id: String,
    pub agent_name: String,
    pub agent_owner: String,
    pub agent_exists: bool,
    pub agent_intact: bool,
    pub agent_active: bool,
    pub agent_in_scope: bool,
    pub reason: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub timestamp: i64,
}

/// `x_state` of a transition entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionInput {
    pub artifact_id: String,
    /// Content hash before the transition.
    pub content_hash: String,
    pub transition_count: u64,
    /// Chain head before the transition was appended.
    pub chain_hash: String,
}

impl ProvenancePayload {
    pub fn as_origin(&self) -> Option<&OriginRecord> {
        match self {
            ProvenancePayload::Origin(origin) => Some(origin),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<&TransitionRecord> {
        match self {
            ProvenancePayload::Transition(transition) => Some(transition),
            _ => None,
        }
    }
}
