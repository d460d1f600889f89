//! The provenance service: origin, transition, verify.
//!
//! Agents are resolved before the artifact lock is taken, and `verify` takes
//! no lock at all, so identity reads never wait on provenance writers.

use std::sync::Arc;
use std::time::Duration;

use pruv_core::{generate_id, now_millis, Chain, EntryBuilder, EntrySigner};
use pruv_identity::{AgentResolver, AgentSnapshot};
use pruv_registry::{
    EntityLocks, MemoryRegistry, Record, Registry, TimedRegistry, DEFAULT_IO_TIMEOUT,
};
use serde_json::Value;

use crate::artifact::{Artifact, OriginRequest, Transition};
use crate::content::Content;
use crate::error::{ProvenanceError, Result};
use crate::payload::{OriginRecord, ProvenancePayload, TransitionInput, TransitionRecord};
use crate::verification::{verify_record, ProvenanceVerificationResult};

/// Operation label of the genesis entry.
pub const OP_ORIGIN: &str = "origin";

/// Operation label of transition entries.
pub const OP_TRANSITION: &str = "transition";

/// Artifact lifecycle over a registry, with agents resolved through an
/// injected [`AgentResolver`].
pub struct ProvenanceService {
    registry: TimedRegistry<Arc<dyn Registry<Artifact>>>,
    resolver: Arc<dyn AgentResolver>,
    locks: EntityLocks,
}

impl ProvenanceService {
    /// Create a service over `registry`, bounding each call by `io_timeout`.
    pub fn new(
        registry: Arc<dyn Registry<Artifact>>,
        resolver: Arc<dyn AgentResolver>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            registry: TimedRegistry::new(registry, io_timeout),
            resolver,
            locks: EntityLocks::new(),
        }
    }

    /// A service over a fresh in-memory registry.
    pub fn in_memory(resolver: Arc<dyn AgentResolver>) -> Self {
        Self::new(Arc::new(MemoryRegistry::new()), resolver, DEFAULT_IO_TIMEOUT)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Start tracking an artifact. Content is hashed and discarded.
    pub async fn origin(&self, request: OriginRequest) -> Result<Artifact> {
        let now = now_millis();
        let content_hash = request.content.hash();

        let artifact = Artifact {
            id: generate_id("artifact"),
            name: request.name,
            classification: request.classification,
            owner: request.owner,
            chain_id: generate_id("chain"),
            origin_hash: content_hash.clone(),
            created_at: now,
            current_state_hash: content_hash.clone(),
            transition_count: 0,
            metadata: request.metadata,
        };

        let payload = ProvenancePayload::Origin(OriginRecord {
            artifact_id: artifact.id.clone(),
            name: artifact.name.clone(),
            classification: artifact.classification.clone(),
            owner: artifact.owner.clone(),
            content_hash,
            metadata: artifact.metadata.clone(),
            timestamp: now,
        });

        let mut chain = Chain::new();
        chain.append(
            EntryBuilder::new(OP_ORIGIN)
                .payload(&payload)?
                .timestamp(now)
                .signer(request.signer),
        );

        self.registry.save_if(&artifact, &chain, None).await?;

        tracing::info!(
            artifact_id = %artifact.id,
            name = %artifact.name,
            origin_hash = %artifact.origin_hash,
            "artifact originated"
        );
        Ok(artifact)
    }

    /// Record a modification made by `agent_id`.
    pub async fn transition(
        &self,
        artifact_id: &str,
        content: impl Into<Content>,
        agent_id: &str,
        reason: &str,
        metadata: Option<Value>,
    ) -> Result<Transition> {
        self.record_transition(artifact_id, content.into(), agent_id, reason, metadata, None)
            .await
    }

    /// Record a modification with a signed entry.
    pub async fn transition_signed(
        &self,
        artifact_id: &str,
        content: impl Into<Content>,
        agent_id: &str,
        reason: &str,
        metadata: Option<Value>,
        signer: EntrySigner,
    ) -> Result<Transition> {
        self.record_transition(
            artifact_id,
            content.into(),
            agent_id,
            reason,
            metadata,
            Some(signer),
        )
        .await
    }

    async fn record_transition(
        &self,
        artifact_id: &str,
        content: Content,
        agent_id: &str,
        reason: &str,
        metadata: Option<Value>,
        signer: Option<EntrySigner>,
    ) -> Result<Transition> {
        let agent = self.snapshot(agent_id).await;

        let _guard = self.locks.lock(artifact_id).await;
        let Record {
            metadata: mut artifact,
            mut chain,
        } = self.load(artifact_id).await?;
        let loaded_len = chain.len();

        let now = now_millis();
        let content_hash = content.hash();
        let previous_hash = artifact.current_state_hash.clone();
        let transition_number = artifact.transition_count + 1;

        let record = TransitionRecord {
            content_hash: content_hash.clone(),
            previous_hash: previous_hash.clone(),
            transition_number,
            agent_id: agent.agent_id.clone(),
            agent_name: agent.name.clone(),
            agent_owner: agent.owner.clone(),
            agent_exists: agent.exists,
            agent_intact: agent.intact,
            agent_active: agent.active,
            agent_in_scope: agent.in_scope,
            reason: reason.to_string(),
            metadata,
            timestamp: now,
        };
        let input = TransitionInput {
            artifact_id: artifact_id.to_string(),
            content_hash: previous_hash,
            transition_count: artifact.transition_count,
            chain_hash: chain.head().to_string(),
        };

        let entry = chain
            .append(
                EntryBuilder::new(OP_TRANSITION)
                    .input(&input)?
                    .payload(&ProvenancePayload::Transition(record.clone()))?
                    .timestamp(now)
                    .signer(signer),
            )
            .clone();

        artifact.current_state_hash = content_hash;
        artifact.transition_count = transition_number;

        self.registry
            .save_if(&artifact, &chain, Some(loaded_len))
            .await?;

        tracing::debug!(
            artifact_id,
            agent_id,
            transition_number,
            agent_authorized = agent.is_authorized(),
            "transition recorded"
        );
        Ok(Transition::from_entry(artifact_id, &entry, &record))
    }

    /// Resolve an agent for recording. Failures degrade to an unknown agent.
    async fn snapshot(&self, agent_id: &str) -> AgentSnapshot {
        match self.resolver.resolve_agent(agent_id).await {
            Ok(snapshot) => {
                if !snapshot.exists {
                    tracing::warn!(agent_id, "transition by unresolved agent");
                }
                snapshot
            }
            Err(e) => {
                tracing::warn!(
                    agent_id,
                    error = %e,
                    "agent resolution failed, recording as unknown"
                );
                AgentSnapshot::unknown(agent_id)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify origin, threading and integrity, and re-verify every
    /// transition's agent live.
    pub async fn verify(&self, artifact_id: &str) -> Result<ProvenanceVerificationResult> {
        let record = self.load(artifact_id).await?;
        let result = verify_record(&record, self.resolver.as_ref()).await;

        if !result.intact {
            tracing::warn!(
                artifact_id,
                break_at = ?result.break_at,
                break_at_agent = ?result.break_at_agent,
                "provenance chain broken"
            );
        }
        if !result.thread_breaks.is_empty() {
            tracing::warn!(
                artifact_id,
                thread_breaks = result.thread_breaks.len(),
                "provenance hash thread broken"
            );
        }
        if !result.authorized() {
            tracing::warn!(
                artifact_id,
                unauthorized = result.unauthorized_transitions.len(),
                "unauthorized transitions"
            );
        }
        if !result.signatures_valid {
            tracing::warn!(
                artifact_id,
                failures = result.signature_failures.len(),
                "provenance chain has invalid signatures"
            );
        }

        Ok(result)
    }

    /// Recorded transitions, most recent first.
    pub async fn history(
        &self,
        artifact_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Transition>> {
        let record = self.load(artifact_id).await?;

        let transitions: Vec<Transition> = record
            .chain
            .decode_payloads::<ProvenancePayload>()
            .filter_map(|(entry, payload)| match payload {
                Some(ProvenancePayload::Transition(t)) => {
                    Some(Transition::from_entry(artifact_id, entry, &t))
                }
                _ => None,
            })
            .collect();

        Ok(transitions
            .into_iter()
            .rev()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub async fn get(&self, artifact_id: &str) -> Result<Artifact> {
        Ok(self.load(artifact_id).await?.metadata)
    }

    pub async fn chain(&self, artifact_id: &str) -> Result<Chain> {
        Ok(self.load(artifact_id).await?.chain)
    }

    /// Load metadata and chain together from one read.
    pub async fn record(&self, artifact_id: &str) -> Result<Record<Artifact>> {
        self.load(artifact_id).await
    }

    /// All artifacts, ordered by id.
    pub async fn list(&self) -> Result<Vec<Artifact>> {
        Ok(self.registry.list_all().await?)
    }

    async fn load(&self, artifact_id: &str) -> Result<Record<Artifact>> {
        self.registry
            .load(artifact_id)
            .await?
            .ok_or_else(|| ProvenanceError::NotFound(artifact_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::UnauthorizedReason;
    use pruv_core::{canonical_json, sha256_hex, BreakKind, GENESIS};
    use pruv_testkit::{FailingResolver, StaticResolver};
    use serde_json::json;

    fn report() -> OriginRequest {
        OriginRequest::new(json!({"title": "Q3 report", "pages": 12}), "q3.pdf", "finance")
            .classification("internal")
    }

    fn service_with(
        resolver: Arc<StaticResolver>,
    ) -> (ProvenanceService, Arc<dyn Registry<Artifact>>) {
        let registry: Arc<dyn Registry<Artifact>> = Arc::new(MemoryRegistry::new());
        let service = ProvenanceService::new(registry.clone(), resolver, DEFAULT_IO_TIMEOUT);
        (service, registry)
    }

    #[tokio::test]
    async fn test_origin_hashes_content() {
        let service = ProvenanceService::in_memory(Arc::new(StaticResolver::new()));
        let artifact = service.origin(report()).await.unwrap();

        let expected =
            sha256_hex(canonical_json(&json!({"pages": 12, "title": "Q3 report"})).as_bytes());
        assert_eq!(artifact.origin_hash, expected);
        assert_eq!(artifact.current_state_hash, expected);
        assert_eq!(artifact.transition_count, 0);

        let chain = service.chain(&artifact.id).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.entries()[0].x, GENESIS);
        assert_eq!(chain.entries()[0].operation, OP_ORIGIN);
    }

    #[tokio::test]
    async fn test_threaded_transitions_verify() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert(StaticResolver::authorized("agent_editor", "editor"));
        let service = ProvenanceService::in_memory(resolver);

        let artifact = service.origin(report()).await.unwrap();
        let mut previous = artifact.origin_hash.clone();
        for version in 1..=3 {
            let t = service
                .transition(
                    &artifact.id,
                    format!("version {version}"),
                    "agent_editor",
                    "edit",
                    None,
                )
                .await
                .unwrap();
            assert_eq!(t.previous_hash, previous);
            assert_eq!(t.transition_number, version);
            previous = t.content_hash;
        }

        let stored = service.get(&artifact.id).await.unwrap();
        assert_eq!(stored.transition_count, 3);
        assert_eq!(stored.current_state_hash, previous);

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(result.intact);
        assert!(result.valid);
        assert!(result.origin_verified);
        assert!(result.current_state_verified);
        assert!(result.authorized());
        assert_eq!(result.transition_count, 3);
        assert_eq!(result.entries, 4);
    }

    #[tokio::test]
    async fn test_transition_unknown_artifact() {
        let service = ProvenanceService::in_memory(Arc::new(StaticResolver::new()));
        let err = service
            .transition("artifact_missing", "x", "agent_a", "edit", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvenanceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_agent_recorded_as_unknown() {
        let service = ProvenanceService::in_memory(Arc::new(StaticResolver::new()));
        let artifact = service.origin(report()).await.unwrap();

        let t = service
            .transition(&artifact.id, "v2", "agent_ghost", "edit", None)
            .await
            .unwrap();
        assert_eq!(t.agent_name, "unknown");
        assert!(!t.agent_in_scope);

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.unauthorized_transitions.len(), 1);
        assert_eq!(
            result.unauthorized_transitions[0].reason,
            UnauthorizedReason::AgentNotFound
        );
    }

    #[tokio::test]
    async fn test_resolver_failure_degrades() {
        let service = ProvenanceService::in_memory(Arc::new(FailingResolver));
        let artifact = service.origin(report()).await.unwrap();

        let t = service
            .transition(&artifact.id, "v2", "agent_a", "edit", None)
            .await
            .unwrap();
        assert_eq!(t.agent_name, "unknown");

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(result.intact);
        assert_eq!(
            result.unauthorized_transitions[0].reason,
            UnauthorizedReason::ResolutionFailed
        );
    }

    #[tokio::test]
    async fn test_authorization_is_live() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert(StaticResolver::authorized("agent_a", "alice"));
        let (service, _) = service_with(resolver.clone());

        let artifact = service.origin(report()).await.unwrap();
        service
            .transition(&artifact.id, "v2", "agent_a", "edit", None)
            .await
            .unwrap();
        assert!(service.verify(&artifact.id).await.unwrap().authorized());

        resolver.update("agent_a", |s| s.active = false);

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(result.intact);
        assert!(result.valid);
        assert!(!result.authorized());
        assert_eq!(
            result.unauthorized_transitions[0].reason,
            UnauthorizedReason::Inactive
        );
        assert!(!result.transitions[0].authorized);
    }

    #[tokio::test]
    async fn test_rewritten_payload_breaks_chain() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert(StaticResolver::authorized("agent_a", "alice"));
        let (service, registry) = service_with(resolver);

        let artifact = service.origin(report()).await.unwrap();
        service.transition(&artifact.id, "v2", "agent_a", "edit", None).await.unwrap();
        service.transition(&artifact.id, "v3", "agent_a", "edit", None).await.unwrap();

        // Only the payload changes; y and xy stay as stored.
        let record = registry.load(&artifact.id).await.unwrap().unwrap();
        let mut entries = record.chain.into_entries();
        let mut payload: ProvenancePayload = entries[2].payload().unwrap();
        if let ProvenancePayload::Transition(t) = &mut payload {
            t.previous_hash = "f".repeat(64);
        }
        entries[2].y_state = Some(serde_json::to_value(&payload).unwrap());
        registry
            .save(&record.metadata, &Chain::from_entries(entries))
            .await
            .unwrap();

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(!result.intact);
        assert!(!result.valid);
        assert_eq!(result.break_at, Some(2));
        assert_eq!(result.verified_count, 2);
        assert_eq!(result.break_detail.unwrap().failure, BreakKind::State);
        assert_eq!(result.break_at_agent.as_deref(), Some("agent_a"));
    }

    #[tokio::test]
    async fn test_unthreaded_transition_detected() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert(StaticResolver::authorized("agent_a", "alice"));
        let (service, registry) = service_with(resolver);

        let artifact = service.origin(report()).await.unwrap();
        service.transition(&artifact.id, "v2", "agent_a", "edit", None).await.unwrap();

        // A writer that appends a well-formed entry whose previous_hash does
        // not continue from the stored state.
        let mut record = registry.load(&artifact.id).await.unwrap().unwrap();
        let stray = TransitionRecord {
            content_hash: Content::from("v3").hash(),
            previous_hash: "f".repeat(64),
            transition_number: 2,
            agent_id: "agent_a".into(),
            agent_name: "alice".into(),
            agent_owner: "ops".into(),
            agent_exists: true,
            agent_intact: true,
            agent_active: true,
            agent_in_scope: true,
            reason: "edit".into(),
            metadata: None,
            timestamp: now_millis(),
        };
        record.chain.append(
            EntryBuilder::new(OP_TRANSITION)
                .payload(&ProvenancePayload::Transition(stray.clone()))
                .unwrap()
                .timestamp(stray.timestamp),
        );
        record.metadata.current_state_hash = stray.content_hash.clone();
        record.metadata.transition_count = 2;
        registry.save(&record.metadata, &record.chain).await.unwrap();

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(result.intact);
        assert!(!result.valid);
        assert!(result.current_state_verified);
        assert_eq!(result.thread_breaks.len(), 1);
        assert_eq!(result.thread_breaks[0].entry_index, 2);
        assert_eq!(result.thread_breaks[0].transition_number, 2);
    }

    #[tokio::test]
    async fn test_tampered_entry_names_agent() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert(StaticResolver::authorized("agent_a", "alice"));
        resolver.insert(StaticResolver::authorized("agent_b", "bob"));
        let (service, registry) = service_with(resolver);

        let artifact = service.origin(report()).await.unwrap();
        service.transition(&artifact.id, "v2", "agent_a", "edit", None).await.unwrap();
        service.transition(&artifact.id, "v3", "agent_b", "edit", None).await.unwrap();
        service.transition(&artifact.id, "v4", "agent_a", "edit", None).await.unwrap();

        let record = registry.load(&artifact.id).await.unwrap().unwrap();
        let mut entries = record.chain.into_entries();
        entries[2].timestamp += 1;
        registry
            .save(&record.metadata, &Chain::from_entries(entries))
            .await
            .unwrap();

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(!result.intact);
        assert!(!result.valid);
        assert_eq!(result.break_at, Some(2));
        assert_eq!(result.verified_count, 2);
        assert_eq!(result.break_at_agent.as_deref(), Some("agent_b"));

        let untrusted: Vec<u64> = result
            .untrusted_transitions()
            .iter()
            .map(|t| t.transition_number)
            .collect();
        assert_eq!(untrusted, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_current_state_mismatch() {
        let (service, registry) = service_with(Arc::new(StaticResolver::new()));
        let artifact = service.origin(report()).await.unwrap();

        let mut record = registry.load(&artifact.id).await.unwrap().unwrap();
        record.metadata.current_state_hash = "0".repeat(64);
        registry.save(&record.metadata, &record.chain).await.unwrap();

        let result = service.verify(&artifact.id).await.unwrap();
        assert!(result.intact);
        assert!(result.origin_verified);
        assert!(!result.current_state_verified);
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_history_most_recent_first() {
        let resolver = Arc::new(StaticResolver::new());
        resolver.insert(StaticResolver::authorized("agent_a", "alice"));
        let service = ProvenanceService::in_memory(resolver);
        let artifact = service.origin(report()).await.unwrap();
        for reason in ["draft", "review", "final"] {
            service
                .transition(&artifact.id, reason, "agent_a", reason, Some(json!({"step": reason})))
                .await
                .unwrap();
        }

        let history = service.history(&artifact.id, None, None).await.unwrap();
        let reasons: Vec<&str> = history.iter().map(|t| t.reason.as_str()).collect();
        assert_eq!(reasons, vec!["final", "review", "draft"]);

        let page = service.history(&artifact.id, Some(2), Some(1)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].reason, "review");
    }
}
