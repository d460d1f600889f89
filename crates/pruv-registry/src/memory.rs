//! In-memory implementation of the Registry trait.
//!
//! Same semantics as SQLite, with no persistence. Useful for tests and
//! short-lived processes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use pruv_core::Chain;
use tokio::sync::RwLock;

use crate::error::{RegistryError, Result};
use crate::traits::{Entity, Record, Registry};

/// In-memory registry.
///
/// All data is lost when the registry is dropped. The write lock makes each
/// save atomic with respect to readers.
pub struct MemoryRegistry<M> {
    records: RwLock<BTreeMap<String, Record<M>>>,
}

impl<M> MemoryRegistry<M> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<M> Default for MemoryRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Entity> Registry<M> for MemoryRegistry<M> {
    async fn save(&self, metadata: &M, chain: &Chain) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(
            metadata.id().to_string(),
            Record {
                metadata: metadata.clone(),
                chain: chain.clone(),
            },
        );
        Ok(())
    }

    async fn save_if(
        &self,
        metadata: &M,
        chain: &Chain,
        expected_len: Option<usize>,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let id = metadata.id();

        let found = records.get(id).map(|r| r.chain.len());
        if found != expected_len {
            return Err(RegistryError::Conflict {
                id: id.to_string(),
                expected: expected_len,
                found,
            });
        }

        records.insert(
            id.to_string(),
            Record {
                metadata: metadata.clone(),
                chain: chain.clone(),
            },
        );
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Record<M>>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(id))
    }

    async fn list_all(&self) -> Result<Vec<M>> {
        let records = self.records.read().await;
        Ok(records.values().map(|r| r.metadata.clone()).collect())
    }
}
