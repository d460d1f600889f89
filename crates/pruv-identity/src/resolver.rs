//! Read-only agent resolution for other domains.
//!
//! Provenance depends on this trait, not on the identity service, so it can
//! be tested against a fake and never writes identity state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The live state of an agent at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub exists: bool,
    pub name: String,
    pub owner: String,
    pub intact: bool,
    pub active: bool,
    /// No recorded action fell outside the declared scope.
    pub in_scope: bool,
}

impl AgentSnapshot {
    /// Snapshot for an id no registry knows about.
    pub fn unknown(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            exists: false,
            name: "unknown".to_string(),
            owner: "unknown".to_string(),
            intact: false,
            active: false,
            in_scope: false,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.exists && self.intact && self.active && self.in_scope
    }
}

/// Resolve an agent id to a live snapshot.
///
/// Unknown ids resolve to a snapshot with `exists == false`; errors are
/// reserved for storage failures.
#[async_trait]
pub trait AgentResolver: Send + Sync {
    async fn resolve_agent(&self, agent_id: &str) -> Result<AgentSnapshot>;
}
