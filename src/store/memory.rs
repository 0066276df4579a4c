use crate::core::cache::{CacheEntry, TtlStore};
use crate::core::clock::{Clock, SystemClock};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-process TTL store. Entries live as long as the process does.
pub struct MemoryStore<V> {
    inner: Mutex<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> TtlStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut entries = self.inner.lock().await;
        let Some(valid) = entries.get(key).map(|entry| entry.is_valid_at(now)) else {
            debug!("Cache MISS for key: {}", key);
            return None;
        };
        if !valid {
            debug!("Cache entry expired for key: {}", key);
            entries.remove(key);
            return None;
        }
        debug!("Cache HIT for key: {}", key);
        entries.get(key).map(|entry| entry.value.clone())
    }

    async fn put(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        let mut entries = self.inner.lock().await;
        debug!("Cache PUT for key: {}", key);
        entries.insert(key.to_string(), entry);
    }

    async fn remove(&self, key: &str) {
        let mut entries = self.inner.lock().await;
        entries.remove(key);
        debug!("Cache REMOVE for key: {}", key);
    }
}

impl<V> MemoryStore<V> {
    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
