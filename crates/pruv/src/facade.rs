//! The `Pruv` facade: both domains behind one handle.
//!
//! The provenance service resolves agents through the identity service, so
//! every provenance verification re-reads the identity registry live.

use std::sync::Arc;

use pruv_core::{now_millis, Chain};
use pruv_identity::{
    AgentIdentity, AgentResolver, IdentityAction, IdentityService, RegisterRequest,
    VerificationResult,
};
use pruv_provenance::{
    Artifact, Content, OriginRequest, ProvenanceService, ProvenanceVerificationResult, Transition,
};
use pruv_registry::{MemoryRegistry, Registry, SqliteDatabase};
use serde_json::Value;

use crate::config::PruvConfig;
use crate::error::Result;
use crate::receipt::{self, ReceiptEnvelope};

/// Identity and provenance services sharing one configuration.
pub struct Pruv {
    config: PruvConfig,
    identity: Arc<IdentityService>,
    provenance: ProvenanceService,
}

impl Pruv {
    /// Create a facade over explicit registries.
    pub fn new(
        identity_registry: Arc<dyn Registry<AgentIdentity>>,
        artifact_registry: Arc<dyn Registry<Artifact>>,
        config: PruvConfig,
    ) -> Self {
        let identity = Arc::new(IdentityService::new(identity_registry, config.io_timeout));
        let resolver: Arc<dyn AgentResolver> = identity.clone();
        let provenance = ProvenanceService::new(artifact_registry, resolver, config.io_timeout);

        Self {
            config,
            identity,
            provenance,
        }
    }

    /// A facade over fresh in-memory registries. `database_path` is ignored.
    pub fn in_memory(config: PruvConfig) -> Self {
        Self::new(
            Arc::new(MemoryRegistry::new()),
            Arc::new(MemoryRegistry::new()),
            config,
        )
    }

    /// Open the configured SQLite database, or fall back to memory when no
    /// path is set.
    pub fn open(config: PruvConfig) -> Result<Self> {
        let Some(path) = config.database_path.clone() else {
            tracing::debug!("no database path configured, using in-memory registries");
            return Ok(Self::in_memory(config));
        };

        let db = SqliteDatabase::open(&path)?;
        tracing::info!(path = %path.display(), "opened pruv database");
        Ok(Self::new(
            Arc::new(db.registry::<AgentIdentity>()),
            Arc::new(db.registry::<Artifact>()),
            config,
        ))
    }

    pub fn config(&self) -> &PruvConfig {
        &self.config
    }

    pub fn identity(&self) -> &IdentityService {
        &self.identity
    }

    pub fn provenance(&self) -> &ProvenanceService {
        &self.provenance
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register(&self, request: RegisterRequest) -> Result<AgentIdentity> {
        Ok(self.identity.register(request).await?)
    }

    pub async fn act(
        &self,
        agent_id: &str,
        action: &str,
        action_scope: &str,
        metadata: Option<Value>,
    ) -> Result<IdentityAction> {
        Ok(self
            .identity
            .act(agent_id, action, action_scope, metadata)
            .await?)
    }

    pub async fn revoke(&self, agent_id: &str, reason: &str) -> Result<AgentIdentity> {
        Ok(self.identity.revoke(agent_id, reason).await?)
    }

    pub async fn verify_identity(&self, agent_id: &str) -> Result<VerificationResult> {
        Ok(self.identity.verify(agent_id).await?)
    }

    pub async fn identity_history(
        &self,
        agent_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<IdentityAction>> {
        Ok(self.identity.history(agent_id, limit, offset).await?)
    }

    pub async fn identity_chain(&self, agent_id: &str) -> Result<Chain> {
        Ok(self.identity.chain(agent_id).await?)
    }

    /// Verify an agent and wrap the result in a receipt.
    pub async fn identity_receipt(&self, agent_id: &str) -> Result<ReceiptEnvelope> {
        let record = self.identity.record(agent_id).await?;
        let now = now_millis();
        let result = pruv_identity::verify_record(&record, now);

        tracing::debug!(agent_id, intact = result.intact, "identity receipt generated");
        Ok(receipt::identity_receipt(&record, &result, now))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Provenance
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn origin(&self, request: OriginRequest) -> Result<Artifact> {
        Ok(self.provenance.origin(request).await?)
    }

    pub async fn transition(
        &self,
        artifact_id: &str,
        content: impl Into<Content>,
        agent_id: &str,
        reason: &str,
        metadata: Option<Value>,
    ) -> Result<Transition> {
        Ok(self
            .provenance
            .transition(artifact_id, content, agent_id, reason, metadata)
            .await?)
    }

    pub async fn verify_provenance(
        &self,
        artifact_id: &str,
    ) -> Result<ProvenanceVerificationResult> {
        Ok(self.provenance.verify(artifact_id).await?)
    }

    pub async fn provenance_history(
        &self,
        artifact_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Transition>> {
        Ok(self.provenance.history(artifact_id, limit, offset).await?)
    }

    pub async fn provenance_chain(&self, artifact_id: &str) -> Result<Chain> {
        Ok(self.provenance.chain(artifact_id).await?)
    }

    /// Verify an artifact, re-resolving its agents live, and wrap the result
    /// in a receipt.
    pub async fn provenance_receipt(&self, artifact_id: &str) -> Result<ReceiptEnvelope> {
        let record = self.provenance.record(artifact_id).await?;
        let result = pruv_provenance::verify_record(&record, self.identity.as_ref()).await;

        tracing::debug!(
            artifact_id,
            intact = result.intact,
            authorized = result.authorized(),
            "provenance receipt generated"
        );
        Ok(receipt::provenance_receipt(&record, &result, now_millis()))
    }
}
