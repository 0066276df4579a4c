use crate::core::cache::{CacheEntry, TtlStore};
use crate::core::clock::{Clock, SystemClock};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const PARTITION_NAME: &str = "ttl";

/// TTL store persisted in a fjall keyspace. Entries are JSON encoded
/// [`CacheEntry`] values keyed by the raw key bytes.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    clock: Arc<dyn Clock>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create cache directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open cache keyspace at {}", path.display()))?;
        let partition = keyspace.open_partition(PARTITION_NAME, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            partition,
            clock,
        })
    }

    fn read<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        let Some(bytes) = self.partition.get(key.as_bytes())? else {
            debug!("Cache MISS for key: {}", key);
            return Ok(None);
        };
        let entry: CacheEntry<V> = serde_json::from_slice(&bytes)?;
        if !entry.is_valid_at(self.clock.now_ms()) {
            debug!("Cache entry expired for key: {}", key);
            self.delete(key)?;
            return Ok(None);
        }
        debug!("Cache HIT for key: {}", key);
        Ok(Some(entry.value))
    }

    fn write<V: Serialize>(&self, key: &str, value: V, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        self.partition
            .insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Cache PUT for key: {}", key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.partition.remove(key.as_bytes())?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Cache REMOVE for key: {}", key);
        Ok(())
    }
}

#[async_trait]
impl<V> TtlStore<V> for DiskStore
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        match self.read(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("DiskStore get error for key {}: {:#}", key, e);
                None
            }
        }
    }

    async fn put(&self, key: &str, value: V, ttl: Duration) {
        if let Err(e) = self.write(key, value, ttl) {
            warn!("DiskStore put error for key {}: {:#}", key, e);
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.delete(key) {
            warn!("DiskStore remove error for key {}: {:#}", key, e);
        }
    }
}
