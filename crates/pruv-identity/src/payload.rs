//! Identity chain payloads.
//!
//! Every identity entry's `y_state` is one of these, discriminated by its
//! `event` field. They are decoded once at the chain boundary; an entry whose
//! state does not decode is treated as carrying no payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `y_state` of an identity chain entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum IdentityPayload {
    Registration(Registration),
    Action(ActionRecord),
    Revocation(Revocation),
}

/// Genesis payload: the identity as declared at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub agent_id: String,
    pub name: String,
    pub framework: String,
    pub owner: String,
    pub scope: Vec<String>,
    pub purpose: String,
    pub valid_from: i64,
    pub valid_until: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// One recorded action, in scope or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,
    pub action_scope: String,
    pub in_scope: bool,
    /// 1-based count of actions including this one.
    pub action_count: u64,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub timestamp: i64,
}

/// Terminal payload: the identity was revoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revocation {
    pub reason: String,
    pub revoked_at: i64,
}

/// `x_state` of an action entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInput {
    pub agent_id: String,
    pub previous_action_count: u64,
    /// Chain head before the action was appended.
    pub chain_hash: String,
}

/// `x_state` of a revocation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationInput {
    pub agent_id: String,
    pub chain_hash: String,
}

impl IdentityPayload {
    pub fn event(&self) -> &'static str {
        match self {
            IdentityPayload::Registration(_) => "registration",
            IdentityPayload::Action(_) => "action",
            IdentityPayload::Revocation(_) => "revocation",
        }
    }

    pub fn as_action(&self) -> Option<&ActionRecord> {
        match self {
            IdentityPayload::Action(action) => Some(action),
            _ => None,
        }
    }
}
