pub mod disk;
pub mod memory;

use crate::core::cache::TtlStore;
use crate::core::clock::Clock;
use crate::core::coin::RawCoin;
use disk::DiskStore;
use memory::MemoryStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub type CatalogStore = Arc<dyn TtlStore<Vec<RawCoin>>>;

/// Opens the persistent catalog store under `data_path/cache`, falling back to
/// an in-memory store when the keyspace cannot be opened.
pub fn open_catalog_store(data_path: Option<&Path>, clock: Arc<dyn Clock>) -> CatalogStore {
    let Some(data_path) = data_path else {
        warn!("No data directory available, catalog cache will not persist");
        return Arc::new(MemoryStore::<Vec<RawCoin>>::with_clock(clock));
    };

    let cache_dir = data_path.join("cache");
    match DiskStore::open_with_clock(&cache_dir, clock.clone()) {
        Ok(store) => {
            debug!("Opened catalog cache at {}", cache_dir.display());
            Arc::new(store)
        }
        Err(e) => {
            warn!("Falling back to in-memory catalog cache: {:#}", e);
            Arc::new(MemoryStore::<Vec<RawCoin>>::with_clock(clock))
        }
    }
}
