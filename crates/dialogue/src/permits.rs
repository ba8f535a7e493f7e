//! Per-key mutual exclusion.
//!
//! One binary permit per key, created on first use and never removed.
//! Work for the same key runs one at a time in acquisition order; work for
//! different keys runs concurrently.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use archtalk_core::error::DialogueError;
use dashmap::DashMap;
use tokio::sync::Semaphore;

pub struct KeyedPermits<K> {
    permits: DashMap<K, Arc<Semaphore>>,
}

impl<K> KeyedPermits<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            permits: DashMap::new(),
        }
    }

    fn permit_for(&self, key: K) -> Arc<Semaphore> {
        self.permits
            .entry(key)
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Await `work` while holding the permit for `key`.
    ///
    /// The permit is released when this future completes or is dropped.
    pub async fn with_permit<F, T>(&self, key: K, work: F) -> Result<T, DialogueError>
    where
        F: Future<Output = T>,
    {
        let semaphore = self.permit_for(key);
        let _permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| DialogueError::Interrupted("permit was closed".into()))?;
        Ok(work.await)
    }

    /// Number of keys that have ever held a permit.
    pub fn len(&self) -> usize {
        self.permits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permits.is_empty()
    }
}

impl<K> Default for KeyedPermits<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
