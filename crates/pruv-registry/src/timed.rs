//! Time-bounded registry wrapper.
//!
//! Every call on the inner registry is raced against a deadline. A call that
//! loses surfaces as [`RegistryError::Timeout`]. The inner operation is
//! dropped, not retried.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pruv_core::Chain;

use crate::error::{RegistryError, Result};
use crate::traits::{Entity, Record, Registry};

/// Default I/O bound for registry calls.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Wraps a registry and bounds each call with `tokio::time::timeout`.
#[derive(Debug, Clone)]
pub struct TimedRegistry<R> {
    inner: R,
    timeout: Duration,
}

impl<R> TimedRegistry<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, after = ?self.timeout, "registry call timed out");
                Err(RegistryError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl<M: Entity, R: Registry<M>> Registry<M> for TimedRegistry<R> {
    async fn save(&self, metadata: &M, chain: &Chain) -> Result<()> {
        self.bounded("save", self.inner.save(metadata, chain)).await
    }

    async fn save_if(
        &self,
        metadata: &M,
        chain: &Chain,
        expected_len: Option<usize>,
    ) -> Result<()> {
        self.bounded("save_if", self.inner.save_if(metadata, chain, expected_len))
            .await
    }

    async fn load(&self, id: &str) -> Result<Option<Record<M>>> {
        self.bounded("load", self.inner.load(id)).await
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        self.bounded("exists", self.inner.exists(id)).await
    }

    async fn list_all(&self) -> Result<Vec<M>> {
        self.bounded("list_all", self.inner.list_all()).await
    }
}
