//! The identity service: register, act, verify, revoke.
//!
//! Every mutation holds the agent's lock across load, append and save, and
//! saves with `save_if` against the length it loaded. Reads take no lock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pruv_core::{generate_id, now_millis, Chain, EntryBuilder, EntrySigner};
use pruv_registry::{
    EntityLocks, MemoryRegistry, Record, Registry, TimedRegistry, DEFAULT_IO_TIMEOUT,
};
use serde_json::Value;

use crate::error::{IdentityError, Result};
use crate::identity::{AgentIdentity, IdentityAction, IdentityStatus, RegisterRequest};
use crate::payload::{
    ActionInput, ActionRecord, IdentityPayload, Registration, Revocation, RevocationInput,
};
use crate::resolver::{AgentResolver, AgentSnapshot};
use crate::verification::{verify_record, VerificationResult};

/// Operation label of the genesis entry.
pub const OP_REGISTER: &str = "register";

/// Operation label of the revocation entry.
pub const OP_REVOKE: &str = "revoke";

/// Agent identity lifecycle over a registry.
pub struct IdentityService {
    registry: TimedRegistry<Arc<dyn Registry<AgentIdentity>>>,
    locks: EntityLocks,
}

impl IdentityService {
    /// Create a service over `registry`, bounding each call by `io_timeout`.
    pub fn new(registry: Arc<dyn Registry<AgentIdentity>>, io_timeout: Duration) -> Self {
        Self {
            registry: TimedRegistry::new(registry, io_timeout),
            locks: EntityLocks::new(),
        }
    }

    /// A service over a fresh in-memory registry.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRegistry::new()), DEFAULT_IO_TIMEOUT)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new agent. The chain starts with a single genesis entry.
    pub async fn register(&self, request: RegisterRequest) -> Result<AgentIdentity> {
        let now = now_millis();
        let identity = AgentIdentity {
            id: generate_id("agent"),
            name: request.name,
            framework: request.framework,
            owner: request.owner,
            scope: request.scope,
            purpose: request.purpose,
            valid_from: request.valid_from.unwrap_or(now),
            valid_until: request.valid_until,
            chain_id: generate_id("chain"),
            created_at: now,
            status: IdentityStatus::Active,
            revoked_at: None,
            revocation_reason: None,
            metadata: request.metadata,
        };

        let payload = IdentityPayload::Registration(Registration {
            agent_id: identity.id.clone(),
            name: identity.name.clone(),
            framework: identity.framework.clone(),
            owner: identity.owner.clone(),
            scope: identity.scope.clone(),
            purpose: identity.purpose.clone(),
            valid_from: identity.valid_from,
            valid_until: identity.valid_until,
            metadata: identity.metadata.clone(),
        });

        let mut chain = Chain::new();
        chain.append(
            EntryBuilder::new(OP_REGISTER)
                .payload(&payload)?
                .timestamp(now)
                .signer(request.signer),
        );

        self.registry.save_if(&identity, &chain, None).await?;

        tracing::info!(
            agent_id = %identity.id,
            name = %identity.name,
            scope = ?identity.scope,
            "agent registered"
        );
        Ok(identity)
    }

    /// Record an action. Out-of-scope actions are recorded, never refused.
    pub async fn act(
        &self,
        agent_id: &str,
        action: &str,
        action_scope: &str,
        metadata: Option<Value>,
    ) -> Result<IdentityAction> {
        self.record_action(agent_id, action, action_scope, metadata, None)
            .await
    }

    /// Record an action with a signed entry.
    pub async fn act_signed(
        &self,
        agent_id: &str,
        action: &str,
        action_scope: &str,
        metadata: Option<Value>,
        signer: EntrySigner,
    ) -> Result<IdentityAction> {
        self.record_action(agent_id, action, action_scope, metadata, Some(signer))
            .await
    }

    async fn record_action(
        &self,
        agent_id: &str,
        action: &str,
        action_scope: &str,
        metadata: Option<Value>,
        signer: Option<EntrySigner>,
    ) -> Result<IdentityAction> {
        let _guard = self.locks.lock(agent_id).await;
        let Record {
            metadata: identity,
            mut chain,
        } = self.load(agent_id).await?;
        let loaded_len = chain.len();

        if identity.is_revoked() {
            tracing::warn!(agent_id, action, "action recorded on revoked identity");
        }

        let in_scope = identity.permits(action_scope);
        if !in_scope {
            tracing::warn!(agent_id, action, action_scope, "out-of-scope action");
        }

        let previous_action_count = count_actions(&chain);
        let now = now_millis();
        let record = ActionRecord {
            action: action.to_string(),
            action_scope: action_scope.to_string(),
            in_scope,
            action_count: previous_action_count + 1,
            metadata,
            timestamp: now,
        };
        let input = ActionInput {
            agent_id: agent_id.to_string(),
            previous_action_count,
            chain_hash: chain.head().to_string(),
        };

        let entry = chain
            .append(
                EntryBuilder::new(action)
                    .input(&input)?
                    .payload(&IdentityPayload::Action(record.clone()))?
                    .timestamp(now)
                    .signer(signer),
            )
            .clone();

        self.registry
            .save_if(&identity, &chain, Some(loaded_len))
            .await?;

        tracing::debug!(agent_id, action, in_scope, index = entry.index, "action recorded");
        Ok(IdentityAction::from_entry(agent_id, &entry, &record))
    }

    /// Revoke an agent. One-way: a second call fails with `AlreadyRevoked`.
    pub async fn revoke(&self, agent_id: &str, reason: &str) -> Result<AgentIdentity> {
        let _guard = self.locks.lock(agent_id).await;
        let Record {
            metadata: mut identity,
            mut chain,
        } = self.load(agent_id).await?;
        let loaded_len = chain.len();

        if identity.is_revoked() {
            return Err(IdentityError::AlreadyRevoked(agent_id.to_string()));
        }

        let now = now_millis();
        let input = RevocationInput {
            agent_id: agent_id.to_string(),
            chain_hash: chain.head().to_string(),
        };
        chain.append(
            EntryBuilder::new(OP_REVOKE)
                .input(&input)?
                .payload(&IdentityPayload::Revocation(Revocation {
                    reason: reason.to_string(),
                    revoked_at: now,
                }))?
                .timestamp(now),
        );

        identity.status = IdentityStatus::Revoked;
        identity.revoked_at = Some(now);
        identity.revocation_reason = Some(reason.to_string());

        self.registry
            .save_if(&identity, &chain, Some(loaded_len))
            .await?;

        tracing::info!(agent_id, reason, "agent revoked");
        Ok(identity)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify the chain, scope record and validity of an agent.
    pub async fn verify(&self, agent_id: &str) -> Result<VerificationResult> {
        let record = self.load(agent_id).await?;
        let result = verify_record(&record, now_millis());

        if !result.intact {
            tracing::warn!(
                agent_id,
                break_at = ?result.break_at,
                verified = result.verified_count,
                entries = result.entries,
                "identity chain broken"
            );
        }
        if !result.signatures_valid {
            tracing::warn!(
                agent_id,
                failures = result.signature_failures.len(),
                "identity chain has invalid signatures"
            );
        }

        Ok(result)
    }

    /// Recorded actions, most recent first.
    pub async fn history(
        &self,
        agent_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<IdentityAction>> {
        let record = self.load(agent_id).await?;

        let actions: Vec<IdentityAction> = record
            .chain
            .decode_payloads::<IdentityPayload>()
            .filter_map(|(entry, payload)| match payload {
                Some(IdentityPayload::Action(action)) => {
                    Some(IdentityAction::from_entry(agent_id, entry, &action))
                }
                _ => None,
            })
            .collect();

        Ok(actions
            .into_iter()
            .rev()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub async fn get(&self, agent_id: &str) -> Result<AgentIdentity> {
        Ok(self.load(agent_id).await?.metadata)
    }

    pub async fn chain(&self, agent_id: &str) -> Result<Chain> {
        Ok(self.load(agent_id).await?.chain)
    }

    /// Load metadata and chain together, for callers that need both views
    /// from one read.
    pub async fn record(&self, agent_id: &str) -> Result<Record<AgentIdentity>> {
        self.load(agent_id).await
    }

    /// All agents, ordered by id.
    pub async fn list(&self) -> Result<Vec<AgentIdentity>> {
        Ok(self.registry.list_all().await?)
    }

    async fn load(&self, agent_id: &str) -> Result<Record<AgentIdentity>> {
        self.registry
            .load(agent_id)
            .await?
            .ok_or_else(|| IdentityError::NotFound(agent_id.to_string()))
    }
}

fn count_actions(chain: &Chain) -> u64 {
    chain
        .decode_payloads::<IdentityPayload>()
        .filter(|(_, payload)| matches!(payload, Some(IdentityPayload::Action(_))))
        .count() as u64
}

#[async_trait]
impl AgentResolver for IdentityService {
    async fn resolve_agent(&self, agent_id: &str) -> Result<AgentSnapshot> {
        let Some(record) = self.registry.load(agent_id).await? else {
            return Ok(AgentSnapshot::unknown(agent_id));
        };

        let result = verify_record(&record, now_millis());
        Ok(AgentSnapshot {
            agent_id: agent_id.to_string(),
            exists: true,
            name: record.metadata.name,
            owner: record.metadata.owner,
            intact: result.intact,
            active: result.active,
            in_scope: result.out_of_scope_actions.is_empty(),
        })
    }
}
