//! Test fixtures and fakes.
//!
//! Common setup code for integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Once, RwLock};

use async_trait::async_trait;
use pruv_core::{EntrySigner, Keypair};
use pruv_identity::{
    AgentIdentity, AgentResolver, AgentSnapshot, IdentityError, IdentityService, RegisterRequest,
};
use pruv_registry::RegistryError;

/// An [`AgentResolver`] answering from a fixed table.
///
/// Unknown ids resolve to [`AgentSnapshot::unknown`].
#[derive(Debug, Default)]
pub struct StaticResolver {
    agents: RwLock<HashMap<String, AgentSnapshot>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot that passes every authorization check.
    pub fn authorized(agent_id: &str, name: &str) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: agent_id.to_string(),
            exists: true,
            name: name.to_string(),
            owner: "test-owner".to_string(),
            intact: true,
            active: true,
            in_scope: true,
        }
    }

    pub fn insert(&self, snapshot: AgentSnapshot) {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        agents.insert(snapshot.agent_id.clone(), snapshot);
    }

    /// Change a stored snapshot in place. Does nothing for unknown ids.
    pub fn update(&self, agent_id: &str, f: impl FnOnce(&mut AgentSnapshot)) {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = agents.get_mut(agent_id) {
            f(snapshot);
        }
    }

    pub fn remove(&self, agent_id: &str) {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        agents.remove(agent_id);
    }
}

#[async_trait]
impl AgentResolver for StaticResolver {
    async fn resolve_agent(&self, agent_id: &str) -> pruv_identity::Result<AgentSnapshot> {
        let agents = self.agents.read().unwrap_or_else(|e| e.into_inner());
        Ok(agents
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| AgentSnapshot::unknown(agent_id)))
    }
}

/// An [`AgentResolver`] whose storage is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingResolver;

#[async_trait]
impl AgentResolver for FailingResolver {
    async fn resolve_agent(&self, _agent_id: &str) -> pruv_identity::Result<AgentSnapshot> {
        Err(IdentityError::Storage(RegistryError::Database(
            "identity registry unavailable".to_string(),
        )))
    }
}

/// An in-memory identity service paired with a signer.
pub struct IdentityFixture {
    pub service: Arc<IdentityService>,
    pub signer: EntrySigner,
}

impl IdentityFixture {
    /// Create a fixture that signs with `keypair`.
    pub fn with_keypair(keypair: Keypair) -> Self {
        Self {
            service: Arc::new(IdentityService::in_memory()),
            signer: EntrySigner::new("test-signer", keypair),
        }
    }

    /// Register an agent with the given scope.
    pub async fn register(&self, name: &str, scope: &[&str]) -> AgentIdentity {
        self.service
            .register(reader_request(name, scope))
            .await
            .unwrap_or_else(|e| panic!("fixture registration failed: {e}"))
    }
}

/// A registration request with test defaults.
pub fn reader_request(name: &str, scope: &[&str]) -> RegisterRequest {
    RegisterRequest::new(name, "test-owner", scope.iter().copied())
        .framework("testkit")
        .purpose("integration testing")
}

/// Install a test subscriber once. Honors `RUST_LOG`; silent by default.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticResolver::new();
        resolver.insert(StaticResolver::authorized("agent_a", "alice"));

        let snapshot = resolver.resolve_agent("agent_a").await.unwrap();
        assert!(snapshot.is_authorized());

        resolver.update("agent_a", |s| s.in_scope = false);
        assert!(!resolver.resolve_agent("agent_a").await.unwrap().is_authorized());

        resolver.remove("agent_a");
        assert!(!resolver.resolve_agent("agent_a").await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_failing_resolver() {
        assert!(FailingResolver.resolve_agent("agent_a").await.is_err());
    }

    #[tokio::test]
    async fn test_identity_fixture() {
        init_test_tracing();
        let fixture = IdentityFixture::with_keypair(Keypair::from_seed(&[1; 32]));
        let agent = fixture.register("reader", &["file.read"]).await;
        let snapshot = fixture.service.resolve_agent(&agent.id).await.unwrap();
        assert!(snapshot.is_authorized());
    }
}
