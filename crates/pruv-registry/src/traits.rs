//! Registry trait: the abstract interface for chain record persistence.
//!
//! A record is one entity's metadata plus its full chain. Domain services
//! are storage-agnostic and talk to this trait only.

use std::sync::Arc;

use async_trait::async_trait;
use pruv_core::Chain;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Metadata stored alongside a chain.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Discriminates record kinds sharing one table.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// A loaded record: metadata plus chain, always read together.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<M> {
    pub metadata: M,
    pub chain: Chain,
}

/// The Registry trait: async interface for record persistence.
///
/// Every write replaces metadata and chain together. Readers see either the
/// previous or the new record in full, never a mix.
#[async_trait]
pub trait Registry<M: Entity>: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a record unconditionally.
    async fn save(&self, metadata: &M, chain: &Chain) -> Result<()>;

    /// Insert or replace a record if the stored chain has the expected length.
    ///
    /// `None` requires the record to be absent. Returns `Conflict` otherwise.
    async fn save_if(&self, metadata: &M, chain: &Chain, expected_len: Option<usize>)
        -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Load a record by id.
    async fn load(&self, id: &str) -> Result<Option<Record<M>>>;

    /// Check whether a record exists.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// List every record's metadata, ordered by id.
    async fn list_all(&self) -> Result<Vec<M>>;
}

#[async_trait]
impl<M: Entity, R: Registry<M> + ?Sized> Registry<M> for Arc<R> {
    async fn save(&self, metadata: &M, chain: &Chain) -> Result<()> {
        (**self).save(metadata, chain).await
    }

    async fn save_if(
        &self,
        metadata: &M,
        chain: &Chain,
        expected_len: Option<usize>,
    ) -> Result<()> {
        (**self).save_if(metadata, chain, expected_len).await
    }

    async fn load(&self, id: &str) -> Result<Option<Record<M>>> {
        (**self).load(id).await
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        (**self).exists(id).await
    }

    async fn list_all(&self) -> Result<Vec<M>> {
        (**self).list_all().await
    }
}
