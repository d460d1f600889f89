//! Per-entity async locks.
//!
//! Mutations of one entity are read-modify-write sequences against the
//! registry. Holding the entity's lock across load, mutate and save keeps
//! concurrent writers in this process from losing each other's entries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Prune idle entries once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// A map of per-id mutexes.
#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Held while an entity is being mutated. Dropping it releases the lock.
pub type EntityGuard = OwnedMutexGuard<()>;

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `id`, waiting for any current holder.
    pub async fn lock(&self, id: &str) -> EntityGuard {
        let entry = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= PRUNE_THRESHOLD {
                prune(&mut locks);
            }
            locks.entry(id.to_string()).or_default().clone()
        };
        entry.lock_owned().await
    }
}

/// Drop entries nobody holds or waits on.
fn prune(locks: &mut HashMap<String, Arc<Mutex<()>>>) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}
