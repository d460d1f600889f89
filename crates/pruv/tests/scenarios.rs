//! End-to-end scenarios, each run against the memory and SQLite backends.

use std::collections::BTreeSet;
use std::sync::Arc;

use pruv::core::{canonical_json, now_millis, sha256_hex, Chain, ChainEntry, GENESIS};
use pruv::identity::IdentityError;
use pruv::provenance::UnauthorizedReason;
use pruv::registry::{MemoryRegistry, Registry, SqliteDatabase};
use pruv::{
    AgentIdentity, Artifact, EntrySigner, Keypair, OriginRequest, ProductData, Pruv, PruvConfig,
    PruvError, RegisterRequest,
};
use pruv_testkit::{init_test_tracing, reader_request};
use serde_json::json;
use tempfile::TempDir;

struct Harness {
    pruv: Pruv,
    identities: Arc<dyn Registry<AgentIdentity>>,
    artifacts: Arc<dyn Registry<Artifact>>,
    _dir: Option<TempDir>,
}

impl Harness {
    fn memory() -> Self {
        init_test_tracing();
        let identities: Arc<dyn Registry<AgentIdentity>> = Arc::new(MemoryRegistry::new());
        let artifacts: Arc<dyn Registry<Artifact>> = Arc::new(MemoryRegistry::new());
        Self {
            pruv: Pruv::new(identities.clone(), artifacts.clone(), PruvConfig::default()),
            identities,
            artifacts,
            _dir: None,
        }
    }

    fn sqlite() -> Self {
        init_test_tracing();
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::open(dir.path().join("pruv.db")).unwrap();
        let identities: Arc<dyn Registry<AgentIdentity>> =
            Arc::new(db.registry::<AgentIdentity>());
        let artifacts: Arc<dyn Registry<Artifact>> = Arc::new(db.registry::<Artifact>());
        Self {
            pruv: Pruv::new(identities.clone(), artifacts.clone(), PruvConfig::default()),
            identities,
            artifacts,
            _dir: Some(dir),
        }
    }

    /// Rewrite a stored identity chain behind the service's back.
    async fn tamper_identity(&self, agent_id: &str, edit: impl FnOnce(&mut Vec<ChainEntry>)) {
        let record = self.identities.load(agent_id).await.unwrap().unwrap();
        let mut entries = record.chain.into_entries();
        edit(&mut entries);
        self.identities
            .save(&record.metadata, &Chain::from_entries(entries))
            .await
            .unwrap();
    }

    async fn tamper_artifact(&self, artifact_id: &str, edit: impl FnOnce(&mut Vec<ChainEntry>)) {
        let record = self.artifacts.load(artifact_id).await.unwrap().unwrap();
        let mut entries = record.chain.into_entries();
        edit(&mut entries);
        self.artifacts
            .save(&record.metadata, &Chain::from_entries(entries))
            .await
            .unwrap();
    }
}

macro_rules! on_both_backends {
    ($($scenario:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $scenario() {
                    super::$scenario(super::Harness::memory()).await;
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $scenario() {
                    super::$scenario(super::Harness::sqlite()).await;
                }
            )*
        }
    };
}

on_both_backends!(
    fresh_registration_is_genesis,
    scope_is_recorded_not_enforced,
    verify_is_repeatable,
    tampered_entry_is_localized,
    expired_identity_is_intact_but_inactive,
    revocation_is_one_way,
    origin_and_threaded_transitions,
    authorization_is_rederived_live,
    tampered_provenance_names_agent,
    forged_scope_payload_is_not_intact,
    unsigned_key_fails_closed,
    receipts_are_deterministic,
);

async fn fresh_registration_is_genesis(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();
    let chain = h.pruv.identity_chain(&agent.id).await.unwrap();

    assert_eq!(chain.len(), 1);
    let genesis = chain.first().unwrap();
    assert_eq!(genesis.index, 0);
    assert_eq!(genesis.x, GENESIS);
    assert!(genesis.x_state.is_none());
    assert!(h.pruv.identity_history(&agent.id, None, None).await.unwrap().is_empty());
}

async fn scope_is_recorded_not_enforced(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();

    let read = h.pruv.act(&agent.id, "read_report", "file.read", None).await.unwrap();
    assert!(read.in_scope);
    let delete = h
        .pruv
        .act(&agent.id, "delete_report", "file.delete", Some(json!({"path": "/q3.pdf"})))
        .await
        .unwrap();
    assert!(!delete.in_scope);

    let result = h.pruv.verify_identity(&agent.id).await.unwrap();
    assert!(result.intact);
    assert_eq!(result.entries, 3);
    assert_eq!(result.in_scope_count, 1);
    assert_eq!(result.out_of_scope_actions.len(), 1);
    assert_eq!(result.out_of_scope_actions[0].action_scope, "file.delete");
    assert_eq!(result.out_of_scope_actions[0].entry_index, 2);

    let history = h.pruv.identity_history(&agent.id, None, None).await.unwrap();
    let actions: Vec<&str> = history.iter().map(|a| a.action.as_str()).collect();
    assert_eq!(actions, ["delete_report", "read_report"]);
}

async fn verify_is_repeatable(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();
    h.pruv.act(&agent.id, "read_report", "file.read", None).await.unwrap();

    let first = h.pruv.verify_identity(&agent.id).await.unwrap();
    let second = h.pruv.verify_identity(&agent.id).await.unwrap();
    assert_eq!(first, second);
}

async fn tampered_entry_is_localized(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();
    for i in 0..5 {
        h.pruv
            .act(&agent.id, &format!("read_{i}"), "file.read", None)
            .await
            .unwrap();
    }

    h.tamper_identity(&agent.id, |entries| {
        entries[3].y = sha256_hex(b"forged");
    })
    .await;

    let result = h.pruv.verify_identity(&agent.id).await.unwrap();
    assert!(!result.intact);
    assert_eq!(result.entries, 6);
    assert_eq!(result.break_at, Some(3));
    assert_eq!(result.verified_count, 3);

    let receipt = h.pruv.identity_receipt(&agent.id).await.unwrap();
    assert!(!receipt.chain_intact);
    assert_eq!(receipt.verified, "3/6");
    assert!(receipt.human_readable.contains("WARNING"));
    assert!(receipt.human_readable.contains("broken at entry 3"));
}

async fn expired_identity_is_intact_but_inactive(h: Harness) {
    let now = now_millis();
    let agent = h
        .pruv
        .register(
            reader_request("temp", &["file.read"])
                .valid_from(now - 60_000)
                .valid_until(now - 1_000),
        )
        .await
        .unwrap();

    let result = h.pruv.verify_identity(&agent.id).await.unwrap();
    assert!(result.intact);
    assert!(!result.active);
}

async fn revocation_is_one_way(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();

    let revoked = h.pruv.revoke(&agent.id, "key compromised").await.unwrap();
    assert!(revoked.is_revoked());

    let err = h.pruv.revoke(&agent.id, "again").await.unwrap_err();
    assert!(matches!(err, PruvError::Identity(IdentityError::AlreadyRevoked(_))));

    let result = h.pruv.verify_identity(&agent.id).await.unwrap();
    assert!(result.intact);
    assert!(!result.active);
    assert_eq!(result.entries, 2);

    let receipt = h.pruv.identity_receipt(&agent.id).await.unwrap();
    match &receipt.product_data {
        ProductData::Identity(data) => {
            assert_eq!(data.revocation_reason.as_deref(), Some("key compromised"));
            assert!(!data.active);
        }
        other => panic!("unexpected product data: {other:?}"),
    }
}

async fn origin_and_threaded_transitions(h: Harness) {
    let agent = h.pruv.register(reader_request("editor", &["doc.edit"])).await.unwrap();
    let content = json!({"title": "Q3 report", "sections": ["intro", "numbers"]});

    let artifact = h
        .pruv
        .origin(OriginRequest::new(content.clone(), "q3.json", "finance"))
        .await
        .unwrap();
    assert_eq!(
        artifact.current_state_hash,
        sha256_hex(canonical_json(&content).as_bytes())
    );

    for k in 1..=4 {
        h.pruv
            .transition(&artifact.id, json!({"revision": k}), &agent.id, "revise", None)
            .await
            .unwrap();
    }

    let result = h.pruv.verify_provenance(&artifact.id).await.unwrap();
    assert!(result.valid);
    assert!(result.authorized());
    assert_eq!(result.transition_count, 4);
    assert_eq!(result.entries, 5);

    let history = h.pruv.provenance_history(&artifact.id, Some(2), None).await.unwrap();
    let numbers: Vec<u64> = history.iter().map(|t| t.transition_number).collect();
    assert_eq!(numbers, [4, 3]);
}

async fn authorization_is_rederived_live(h: Harness) {
    let agent = h.pruv.register(reader_request("editor", &["doc.edit"])).await.unwrap();
    let artifact = h
        .pruv
        .origin(OriginRequest::new("v1", "notes.txt", "ops"))
        .await
        .unwrap();
    h.pruv
        .transition(&artifact.id, "v2", &agent.id, "edit", None)
        .await
        .unwrap();

    assert!(h.pruv.verify_provenance(&artifact.id).await.unwrap().authorized());

    h.pruv.revoke(&agent.id, "left the team").await.unwrap();

    let result = h.pruv.verify_provenance(&artifact.id).await.unwrap();
    assert!(result.intact);
    assert!(result.valid);
    assert_eq!(result.unauthorized_transitions.len(), 1);
    assert_eq!(result.unauthorized_transitions[0].entry_index, 1);
    assert_eq!(result.unauthorized_transitions[0].agent_id, agent.id);
    assert_eq!(
        result.unauthorized_transitions[0].reason,
        UnauthorizedReason::Inactive
    );

    let receipt = h.pruv.provenance_receipt(&artifact.id).await.unwrap();
    assert!(receipt.chain_intact);
    assert!(receipt.human_readable.contains("Unauthorized transition 1 at entry 1"));
}

async fn tampered_provenance_names_agent(h: Harness) {
    let alice = h.pruv.register(reader_request("alice", &["doc.edit"])).await.unwrap();
    let bob = h.pruv.register(reader_request("bob", &["doc.edit"])).await.unwrap();
    let artifact = h
        .pruv
        .origin(OriginRequest::new("v1", "plan.md", "ops"))
        .await
        .unwrap();
    h.pruv.transition(&artifact.id, "v2", &alice.id, "draft", None).await.unwrap();
    h.pruv.transition(&artifact.id, "v3", &bob.id, "review", None).await.unwrap();
    h.pruv.transition(&artifact.id, "v4", &alice.id, "final", None).await.unwrap();

    h.tamper_artifact(&artifact.id, |entries| {
        entries[2].operation = "rewritten".to_string();
    })
    .await;

    let result = h.pruv.verify_provenance(&artifact.id).await.unwrap();
    assert!(!result.intact);
    assert!(!result.valid);
    assert_eq!(result.break_at, Some(2));
    assert_eq!(result.break_at_agent.as_deref(), Some(bob.id.as_str()));

    let untrusted: Vec<u64> = result
        .untrusted_transitions()
        .iter()
        .map(|t| t.transition_number)
        .collect();
    assert_eq!(untrusted, [2, 3]);

    let receipt = h.pruv.provenance_receipt(&artifact.id).await.unwrap();
    assert_eq!(receipt.verified, "2/4");
    assert!(receipt.human_readable.contains("can no longer be trusted"));
    match &receipt.product_data {
        ProductData::Provenance(data) => assert_eq!(data.untrusted_entries, [2, 3]),
        other => panic!("unexpected product data: {other:?}"),
    }
}

async fn forged_scope_payload_is_not_intact(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();
    h.pruv.act(&agent.id, "escalate", "system.admin", None).await.unwrap();
    let report = h
        .pruv
        .origin(OriginRequest::new("v1", "report.md", "ops"))
        .await
        .unwrap();
    h.pruv.transition(&report.id, "v2", &agent.id, "edit", None).await.unwrap();

    let before = h.pruv.verify_provenance(&report.id).await.unwrap();
    assert_eq!(before.unauthorized_transitions[0].reason, UnauthorizedReason::OutOfScope);

    // Rewrite only the payload so the action reads as in scope.
    h.tamper_identity(&agent.id, |entries| {
        let state = entries[1].y_state.as_mut().unwrap();
        state["in_scope"] = json!(true);
        state["action_scope"] = json!("file.read");
    })
    .await;

    let identity = h.pruv.verify_identity(&agent.id).await.unwrap();
    assert!(!identity.intact);
    assert_eq!(identity.break_at, Some(1));
    assert_eq!(identity.verified_count, 1);

    let after = h.pruv.verify_provenance(&report.id).await.unwrap();
    assert!(after.intact);
    assert!(!after.authorized());
    assert_eq!(after.unauthorized_transitions[0].reason, UnauthorizedReason::ChainBroken);

    let receipt = h.pruv.identity_receipt(&agent.id).await.unwrap();
    assert!(!receipt.chain_intact);
    assert!(receipt.human_readable.contains("state check failed"));
}

async fn unsigned_key_fails_closed(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();
    let signer = EntrySigner::new("ops-key", Keypair::from_seed(&[9; 32]));
    h.pruv
        .identity()
        .act_signed(&agent.id, "read_report", "file.read", None, signer)
        .await
        .unwrap();

    assert!(h.pruv.verify_identity(&agent.id).await.unwrap().signatures_valid);

    h.tamper_identity(&agent.id, |entries| {
        entries[1].public_key = None;
    })
    .await;

    let result = h.pruv.verify_identity(&agent.id).await.unwrap();
    assert!(result.intact);
    assert!(!result.signatures_valid);
    assert_eq!(result.signature_failures.len(), 1);
    assert_eq!(result.signature_failures[0].index, 1);
}

async fn receipts_are_deterministic(h: Harness) {
    let agent = h.pruv.register(reader_request("reader", &["file.read"])).await.unwrap();
    h.pruv.act(&agent.id, "read_report", "file.read", None).await.unwrap();
    h.pruv.act(&agent.id, "write_report", "file.write", None).await.unwrap();

    let first = h.pruv.identity_receipt(&agent.id).await.unwrap();
    let second = h.pruv.identity_receipt(&agent.id).await.unwrap();
    assert_eq!(first.human_readable, second.human_readable);
    assert_eq!(first.product_data, second.product_data);

    let text = &first.human_readable;
    let order = [
        "pruv identity receipt",
        "Declared attributes",
        "Verification",
        "Timeline",
        "Checklist",
        "WARNING",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|section| text.find(section).unwrap_or_else(|| panic!("missing {section}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    assert!(text.contains("Out-of-scope action at entry 2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acts_never_lose_entries() {
    for h in [Harness::memory(), Harness::sqlite()] {
        let pruv = Arc::new(h.pruv);
        let agent = pruv.register(reader_request("busy", &["file.read"])).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let pruv = pruv.clone();
            let id = agent.id.clone();
            handles.push(tokio::spawn(async move {
                pruv.act(&id, &format!("read_{i}"), "file.read", None)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let result = pruv.verify_identity(&agent.id).await.unwrap();
        assert!(result.intact);
        assert_eq!(result.entries, 17);
        assert_eq!(result.action_count, 16);

        let counts: BTreeSet<u64> = pruv
            .identity_history(&agent.id, None, None)
            .await
            .unwrap()
            .iter()
            .map(|a| a.action_count)
            .collect();
        assert_eq!(counts, (1..=16).collect());
    }
}

#[tokio::test]
async fn sqlite_survives_reopen() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = PruvConfig::default().with_database(dir.path().join("pruv.db"));

    let agent_id = {
        let pruv = Pruv::open(config.clone()).unwrap();
        let agent = pruv
            .register(RegisterRequest::new("reader", "ops", ["file.read"]))
            .await
            .unwrap();
        pruv.act(&agent.id, "read_report", "file.read", None).await.unwrap();
        agent.id
    };

    let pruv = Pruv::open(config).unwrap();
    let result = pruv.verify_identity(&agent_id).await.unwrap();
    assert!(result.intact);
    assert_eq!(result.entries, 2);
    assert_eq!(pruv.identity().list().await.unwrap().len(), 1);
}
