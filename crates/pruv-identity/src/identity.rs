//! Agent identities and the views reconstructed from their chains.

use pruv_core::{ChainEntry, EntrySigner};
use pruv_registry::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::ActionRecord;

/// Persisted lifecycle status. "Expired" is derived from the validity
/// window and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    Active,
    Revoked,
}

impl IdentityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityStatus::Active => "active",
            IdentityStatus::Revoked => "revoked",
        }
    }
}

/// An agent with a declared capability scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub id: String,
    pub name: String,
    pub framework: String,
    pub owner: String,
    /// Capability strings, matched exactly.
    pub scope: Vec<String>,
    pub purpose: String,
    pub valid_from: i64,
    /// `None` means no expiry.
    pub valid_until: Option<i64>,
    pub chain_id: String,
    pub created_at: i64,
    pub status: IdentityStatus,
    #[serde(default)]
    pub revoked_at: Option<i64>,
    #[serde(default)]
    pub revocation_reason: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl Entity for AgentIdentity {
    const KIND: &'static str = "identity";

    fn id(&self) -> &str {
        &self.id
    }
}

impl AgentIdentity {
    /// Exact membership; no wildcards, no prefixes.
    pub fn permits(&self, action_scope: &str) -> bool {
        self.scope.iter().any(|s| s == action_scope)
    }

    pub fn is_revoked(&self) -> bool {
        self.status == IdentityStatus::Revoked
    }

    /// `now` falls inside `[valid_from, valid_until]`.
    pub fn within_validity(&self, now: i64) -> bool {
        now >= self.valid_from && self.valid_until.map_or(true, |until| now <= until)
    }

    /// Active status and inside the validity window.
    pub fn is_active_at(&self, now: i64) -> bool {
        !self.is_revoked() && self.within_validity(now)
    }
}

/// Input to [`crate::IdentityService::register`].
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub framework: String,
    pub owner: String,
    pub scope: Vec<String>,
    pub purpose: String,
    /// Defaults to the registration time.
    pub valid_from: Option<i64>,
    pub valid_until: Option<i64>,
    pub metadata: Option<Value>,
    /// Sign the genesis entry with this key.
    pub signer: Option<EntrySigner>,
}

impl RegisterRequest {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        owner: impl Into<String>,
        scope: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            framework: String::new(),
            owner: owner.into(),
            scope: scope.into_iter().map(Into::into).collect(),
            purpose: String::new(),
            valid_from: None,
            valid_until: None,
            metadata: None,
            signer: None,
        }
    }

    pub fn framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = framework.into();
        self
    }

    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    pub fn valid_from(mut self, at: i64) -> Self {
        self.valid_from = Some(at);
        self
    }

    pub fn valid_until(mut self, at: i64) -> Self {
        self.valid_until = Some(at);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn signer(mut self, signer: EntrySigner) -> Self {
        self.signer = Some(signer);
        self
    }
}

/// A recorded action, reconstructed from its chain entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityAction {
    pub agent_id: String,
    pub entry_index: u64,
    pub action: String,
    pub action_scope: String,
    pub in_scope: bool,
    pub action_count: u64,
    pub timestamp: i64,
    pub metadata: Option<Value>,
    /// Proof of the entry that recorded the action.
    pub xy: String,
    pub signer_id: Option<String>,
}

impl IdentityAction {
    pub(crate) fn from_entry(agent_id: &str, entry: &ChainEntry, record: &ActionRecord) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            entry_index: entry.index,
            action: record.action.clone(),
            action_scope: record.action_scope.clone(),
            in_scope: record.in_scope,
            action_count: record.action_count,
            timestamp: record.timestamp,
            metadata: record.metadata.clone(),
            xy: entry.xy.clone(),
            signer_id: entry.signer_id.clone(),
        }
    }
}
