//! Artifacts and the transition views reconstructed from their chains.

use pruv_core::{ChainEntry, EntrySigner};
use pruv_registry::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::Content;
use crate::payload::TransitionRecord;

/// A tracked artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    pub classification: String,
    pub owner: String,
    pub chain_id: String,
    /// Content hash at origin.
    pub origin_hash: String,
    pub created_at: i64,
    /// Content hash after the latest transition. Updated with every
    /// transition, in the same write as the chain.
    pub current_state_hash: String,
    pub transition_count: u64,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl Entity for Artifact {
    const KIND: &'static str = "artifact";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Input to [`crate::ProvenanceService::origin`].
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub content: Content,
    pub name: String,
    pub classification: String,
    pub owner: String,
    pub metadata: Option<Value>,
    pub signer: Option<EntrySigner>,
}

impl OriginRequest {
    pub fn new(
        content: impl Into<Content>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            name: name.into(),
            classification: String::new(),
            owner: owner.into(),
            metadata: None,
            signer: None,
        }
    }

    pub fn classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = classification.into();
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

/// A recorded transition, reconstructed from its chain entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub artifact_id: String,
    pub entry_index: u64,
    pub transition_number: u64,
    pub previous_hash: String,
    pub content_hash: String,
    pub agent_id: String,
    pub agent_name: String,
    /// The agent's scope record when the transition was made.
    pub agent_in_scope: bool,
    pub reason: String,
    pub metadata: Option<Value>,
    pub timestamp: i64,
    pub xy: String,
    pub signer_id: Option<String>,
}

impl Transition {
    pub(crate) fn from_entry(
        artifact_id: &str,
        entry: &ChainEntry,
        record: &TransitionRecord,
    ) -> Self {
        Self {
            artifact_id: artifact_id.to_string(),
            entry_index: entry.index,
            transition_number: record.transition_number,
            previous_hash: record.previous_hash.clone(),
            content_hash: record.content_hash.clone(),
            agent_id: record.agent_id.clone(),
            agent_name: record.agent_name.clone(),
            agent_in_scope: record.agent_in_scope,
            reason: record.reason.clone(),
            metadata: record.metadata.clone(),
            timestamp: record.timestamp,
            xy: entry.xy.clone(),
            signer_id: entry.signer_id.clone(),
        }
    }
}
