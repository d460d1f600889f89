//! ChainEntry: one immutable, hash-bound state transition.
//!
//! Once appended, an entry is never edited. Changes are new entries.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{proof, signed_message, state_hash};
use crate::crypto::{EntrySigner, PublicKey, Signature};
use crate::error::CoreError;
use crate::types::{now_millis, STATUS_SUCCESS};

/// A single link of a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Position in the chain (0-based, contiguous).
    pub index: u64,

    /// Unix milliseconds at append time.
    pub timestamp: i64,

    /// Free-text label of the transition.
    pub operation: String,

    /// Input-state hash: the previous entry's `y`, or `GENESIS`.
    pub x: String,

    /// Output-state hash: SHA-256 of the canonical `y_state`.
    pub y: String,

    /// Proof binding `x`, `operation`, `y` and `timestamp`.
    pub xy: String,

    pub status: String,

    #[serde(default)]
    pub x_state: Option<Value>,

    #[serde(default)]
    pub y_state: Option<Value>,

    /// Hex Ed25519 signature over the canonical entry fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_id: Option<String>,

    /// Hex Ed25519 public key of the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// Outcome of a successful signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// The entry carries no signature.
    Unsigned,
    /// The signature verified against the entry's public key.
    Valid,
}

impl ChainEntry {
    /// Recompute the proof from the stored `x`, `operation`, `y` and `timestamp`.
    pub fn expected_proof(&self) -> String {
        proof(&self.x, &self.operation, &self.y, self.timestamp)
    }

    /// Check the stored proof against a recomputation.
    pub fn has_valid_proof(&self) -> bool {
        self.xy == self.expected_proof()
    }

    /// Check that `y` is the hash of the stored `y_state`.
    pub fn has_valid_state(&self) -> bool {
        self.y == state_hash(self.y_state.as_ref())
    }

    /// The bytes covered by this entry's signature.
    pub fn signed_message(&self) -> Vec<u8> {
        signed_message(
            self.index,
            self.timestamp,
            &self.operation,
            &self.x,
            &self.y,
            &self.xy,
        )
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Validate the signature, failing closed.
    ///
    /// An entry with a signature but no public key is an error in itself.
    pub fn verify_signature(&self) -> Result<SignatureStatus, CoreError> {
        let Some(signature_hex) = &self.signature else {
            return Ok(SignatureStatus::Unsigned);
        };
        let key_hex = self
            .public_key
            .as_deref()
            .ok_or(CoreError::MissingPublicKey)?;

        let public_key = PublicKey::from_hex(key_hex)?;
        let signature = Signature::from_hex(signature_hex)?;
        public_key.verify(&self.signed_message(), &signature)?;
        Ok(SignatureStatus::Valid)
    }

    /// Decode `y_state` into a typed payload.
    ///
    /// Returns `None` when the state is absent or does not match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Option<T> {
        self.y_state
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Decode `x_state` into a typed value.
    pub fn input<T: DeserializeOwned>(&self) -> Option<T> {
        self.x_state
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Builder for the next entry of a chain.
///
/// The index and `x` are assigned by [`crate::Chain::append`].
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    operation: String,
    x_state: Option<Value>,
    y_state: Option<Value>,
    timestamp: Option<i64>,
    signer: Option<EntrySigner>,
}

impl EntryBuilder {
    /// Start building an entry for `operation`.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            x_state: None,
            y_state: None,
            timestamp: None,
            signer: None,
        }
    }

    /// Set the input state.
    pub fn x_state(mut self, state: Value) -> Self {
        self.x_state = Some(state);
        self
    }

    /// Set the output state.
    pub fn y_state(mut self, state: Value) -> Self {
        self.y_state = Some(state);
        self
    }

    /// Serialize a typed input state.
    pub fn input<T: Serialize>(self, input: &T) -> Result<Self, CoreError> {
        let value = serde_json::to_value(input).map_err(|e| CoreError::Encoding(e.to_string()))?;
        Ok(self.x_state(value))
    }

    /// Serialize a typed output payload.
    pub fn payload<T: Serialize>(self, payload: &T) -> Result<Self, CoreError> {
        let value =
            serde_json::to_value(payload).map_err(|e| CoreError::Encoding(e.to_string()))?;
        Ok(self.y_state(value))
    }

    /// Pin the timestamp instead of reading the clock.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Sign the entry when a signer is given.
    pub fn signer(mut self, signer: Option<EntrySigner>) -> Self {
        self.signer = signer;
        self
    }

    pub(crate) fn build(self, index: u64, x: String) -> ChainEntry {
        let timestamp = self.timestamp.unwrap_or_else(now_millis);
        let y = state_hash(self.y_state.as_ref());
        let xy = proof(&x, &self.operation, &y, timestamp);

        let mut entry = ChainEntry {
            index,
            timestamp,
            operation: self.operation,
            x,
            y,
            xy,
            status: STATUS_SUCCESS.to_string(),
            x_state: self.x_state,
            y_state: self.y_state,
            signature: None,
            signer_id: None,
            public_key: None,
        };

        if let Some(signer) = self.signer {
            let signature = signer.keypair.sign(&entry.signed_message());
            entry.signature = Some(signature.to_hex());
            entry.public_key = Some(signer.keypair.public_key().to_hex());
            entry.signer_id = Some(signer.signer_id);
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::types::GENESIS;
    use serde_json::json;

    fn signed_entry() -> ChainEntry {
        let signer = EntrySigner::new("ops-team", Keypair::from_seed(&[0x11; 32]));
        EntryBuilder::new("register")
            .y_state(json!({"event": "registration"}))
            .timestamp(1736870400000)
            .signer(Some(signer))
            .build(0, GENESIS.to_string())
    }

    #[test]
    fn test_build_computes_hashes() {
        let entry = EntryBuilder::new("register")
            .timestamp(1736870400000)
            .build(0, GENESIS.to_string());

        assert_eq!(entry.x, GENESIS);
        assert_eq!(
            entry.y,
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        assert_eq!(
            entry.xy,
            "xy_4e96f3314509d095fac4faab5e1ad38ede05f2f6334083a5d6a56215319c894a"
        );
        assert_eq!(entry.status, STATUS_SUCCESS);
        assert!(entry.has_valid_proof());
        assert!(entry.has_valid_state());
    }

    #[test]
    fn test_rewritten_state_detected() {
        let mut entry = signed_entry();
        entry.y_state = Some(json!({"event": "revocation"}));

        assert!(entry.has_valid_proof());
        assert!(!entry.has_valid_state());

        entry.y_state = None;
        assert!(!entry.has_valid_state());
    }

    #[test]
    fn test_signed_entry_verifies() {
        let entry = signed_entry();
        assert_eq!(entry.signer_id.as_deref(), Some("ops-team"));
        assert_eq!(entry.verify_signature().unwrap(), SignatureStatus::Valid);
    }

    #[test]
    fn test_unsigned_entry() {
        let entry = EntryBuilder::new("noop").build(0, GENESIS.to_string());
        assert_eq!(entry.verify_signature().unwrap(), SignatureStatus::Unsigned);
    }

    #[test]
    fn test_signature_without_key_fails_closed() {
        let mut entry = signed_entry();
        entry.public_key = None;
        assert!(matches!(
            entry.verify_signature(),
            Err(CoreError::MissingPublicKey)
        ));
    }

    #[test]
    fn test_signature_over_tampered_fields_fails() {
        let mut entry = signed_entry();
        entry.operation = "revoke".into();
        assert!(matches!(
            entry.verify_signature(),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        let mut entry = signed_entry();
        entry.public_key = Some(Keypair::from_seed(&[0x22; 32]).public_key().to_hex());
        assert!(matches!(
            entry.verify_signature(),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_payload_decoding() {
        #[derive(Deserialize)]
        struct Registration {
            event: String,
        }

        let entry = signed_entry();
        let payload: Registration = entry.payload().unwrap();
        assert_eq!(payload.event, "registration");

        #[derive(Deserialize)]
        #[allow(dead_code)]
        struct Other {
            missing_field: u32,
        }
        assert!(entry.payload::<Other>().is_none());
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = EntryBuilder::new("register")
            .timestamp(5)
            .build(0, GENESIS.to_string());
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value["x_state"].is_null());
        assert!(value.get("signature").is_none());
        let decoded: ChainEntry = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, entry);
    }
}
