//! Expiring key/value storage abstraction.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Stored value plus the instant (epoch ms) after which it is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at_epoch_ms: i64,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, now_ms: i64, ttl: Duration) -> Self {
        let ttl_ms = ttl.num_milliseconds();
        // Non-positive TTLs must already be expired at `now_ms`.
        let expires_at_epoch_ms = if ttl_ms <= 0 {
            now_ms.saturating_add(ttl_ms).saturating_sub(1)
        } else {
            now_ms.saturating_add(ttl_ms)
        };
        Self {
            value,
            expires_at_epoch_ms,
        }
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms <= self.expires_at_epoch_ms
    }
}

/// A store whose entries expire. A missing or expired key is a plain `None`,
/// never an error; expired entries are purged by the read that finds them.
#[async_trait]
pub trait TtlStore<V>: Send + Sync
where
    V: Send + 'static,
{
    async fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` for `ttl`, replacing whatever was under `key`.
    async fn put(&self, key: &str, value: V, ttl: Duration);

    async fn remove(&self, key: &str);
}
