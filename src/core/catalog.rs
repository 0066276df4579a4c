//! The keyed collection of known coins and its cache-first loading policy.

use crate::core::cache::TtlStore;
use crate::core::coin::{CatalogSource, Coin, RawCoin};
use crate::core::error::TrackerError;
use chrono::Duration;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Store key under which the raw provider payload is cached.
pub const CATALOG_KEY: &str = "catalog";

/// Default validity of the cached catalog: one hour.
pub const CATALOG_TTL_MS: i64 = 3_600_000;

/// Where the coins of the last successful load came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    Cache,
    Network,
}

#[derive(Debug, Default, Clone)]
pub struct Catalog {
    coins: Vec<Coin>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole catalog with one coin per distinct id in `raw`.
    /// A repeated id keeps the position of its first occurrence and the data
    /// of its last.
    pub fn refresh(&mut self, raw: &[RawCoin]) {
        let mut coins: Vec<Coin> = Vec::with_capacity(raw.len());
        let mut index = HashMap::with_capacity(raw.len());
        for record in raw {
            let coin = Coin::from(record);
            match index.get(&coin.id) {
                Some(&pos) => coins[pos] = coin,
                None => {
                    index.insert(coin.id.clone(), coins.len());
                    coins.push(coin);
                }
            }
        }
        debug!("Catalog refreshed with {} coins", coins.len());
        self.coins = coins;
        self.index = index;
    }

    pub fn get(&self, id: &str) -> Option<&Coin> {
        self.index.get(id).map(|&pos| &self.coins[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates coins in refresh order. The iterator is `Clone`, so it can be
    /// restarted without touching the catalog.
    pub fn all(&self) -> std::slice::Iter<'_, Coin> {
        self.coins.iter()
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Loads the catalog, preferring the cached snapshot over the network.
    ///
    /// On a cache hit the network is skipped entirely. On a miss the source is
    /// queried and a successful response is written back with `ttl`. A failed
    /// fetch leaves the catalog as it was and is returned for the caller to
    /// surface.
    pub async fn load(
        &mut self,
        store: &dyn TtlStore<Vec<RawCoin>>,
        source: &dyn CatalogSource,
        ttl: Duration,
    ) -> Result<CatalogOrigin, TrackerError> {
        if let Some(cached) = store.get(CATALOG_KEY).await {
            self.refresh(&cached);
            info!("Loaded {} coins from cache", self.len());
            return Ok(CatalogOrigin::Cache);
        }
        self.fetch_and_store(store, source, ttl).await
    }

    /// Loads from the source regardless of the cache. The cached snapshot is
    /// only overwritten once a fresh one has been fetched.
    pub async fn reload(
        &mut self,
        store: &dyn TtlStore<Vec<RawCoin>>,
        source: &dyn CatalogSource,
        ttl: Duration,
    ) -> Result<CatalogOrigin, TrackerError> {
        self.fetch_and_store(store, source, ttl).await
    }

    async fn fetch_and_store(
        &mut self,
        store: &dyn TtlStore<Vec<RawCoin>>,
        source: &dyn CatalogSource,
        ttl: Duration,
    ) -> Result<CatalogOrigin, TrackerError> {
        let raw = source.fetch_coins().await.map_err(|e| {
            warn!("Catalog fetch failed: {:#}", e);
            TrackerError::fetch_failure("the catalog provider", &e)
        })?;
        self.refresh(&raw);
        store.put(CATALOG_KEY, raw, ttl).await;
        info!("Loaded {} coins from provider", self.len());
        Ok(CatalogOrigin::Network)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::store::memory::MemoryStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn raw_coin(id: &str, symbol: &str, name: &str, price: f64) -> RawCoin {
        RawCoin {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            image: Some(format!("https://img.example/{id}.png")),
            current_price: Some(price),
        }
    }

    pub(crate) fn sample_raw() -> Vec<RawCoin> {
        vec![
            raw_coin("bitcoin", "btc", "Bitcoin", 64000.0),
            raw_coin("ethereum", "eth", "Ethereum", 3000.0),
            raw_coin("tether", "usdt", "Tether", 1.0),
        ]
    }

    pub(crate) struct MockSource {
        pub coins: Option<Vec<RawCoin>>,
        pub calls: AtomicUsize,
    }

    impl MockSource {
        pub(crate) fn ok(coins: Vec<RawCoin>) -> Self {
            Self {
                coins: Some(coins),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                coins: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogSource for MockSource {
        async fn fetch_coins(&self) -> Result<Vec<RawCoin>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.coins
                .clone()
                .ok_or_else(|| anyhow!("connection refused"))
        }
    }

    #[test]
    fn test_refresh_builds_one_coin_per_record() {
        let mut catalog = Catalog::new();
        catalog.refresh(&sample_raw());

        let ids: Vec<&str> = catalog.all().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "tether"]);
        assert_eq!(catalog.get("ethereum").unwrap().symbol, "eth");
        assert!(catalog.get("dogecoin").is_none());
    }

    #[test]
    fn test_refresh_duplicate_ids_last_occurrence_wins() {
        let mut catalog = Catalog::new();
        catalog.refresh(&[
            raw_coin("bitcoin", "btc", "Bitcoin", 1.0),
            raw_coin("ethereum", "eth", "Ethereum", 2.0),
            raw_coin("bitcoin", "btc", "Bitcoin", 3.0),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("bitcoin").unwrap().current_price_usd, Some(3.0));
        assert_eq!(catalog.all().next().unwrap().id, "bitcoin");
    }

    #[test]
    fn test_refresh_replaces_previous_snapshot() {
        let mut catalog = Catalog::new();
        catalog.refresh(&sample_raw());
        catalog.refresh(&[raw_coin("solana", "sol", "Solana", 150.0)]);

        assert_eq!(catalog.len(), 1);
        assert!(!catalog.contains("bitcoin"));
        assert!(catalog.contains("solana"));
    }

    #[test]
    fn test_all_is_restartable() {
        let mut catalog = Catalog::new();
        catalog.refresh(&sample_raw());

        let iter = catalog.all();
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_load_miss_fetches_and_caches() {
        let store = MemoryStore::<Vec<RawCoin>>::new();
        let source = MockSource::ok(sample_raw());
        let mut catalog = Catalog::new();

        let origin = catalog
            .load(&store, &source, Duration::milliseconds(CATALOG_TTL_MS))
            .await
            .unwrap();

        assert_eq!(origin, CatalogOrigin::Network);
        assert_eq!(catalog.len(), 3);
        assert_eq!(store.get(CATALOG_KEY).await, Some(sample_raw()));
    }

    #[tokio::test]
    async fn test_load_hit_skips_network() {
        let store = MemoryStore::<Vec<RawCoin>>::new();
        store
            .put(CATALOG_KEY, sample_raw(), Duration::hours(1))
            .await;
        let source = MockSource::ok(vec![]);
        let mut catalog = Catalog::new();

        let origin = catalog
            .load(&store, &source, Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(origin, CatalogOrigin::Cache);
        assert_eq!(catalog.len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_load_after_expiry_goes_to_network() {
        let clock = Arc::new(ManualClock::new(0));
        let store = MemoryStore::<Vec<RawCoin>>::with_clock(clock.clone());
        let source = MockSource::ok(sample_raw());
        let mut catalog = Catalog::new();

        catalog
            .load(&store, &source, Duration::hours(1))
            .await
            .unwrap();
        clock.advance(Duration::hours(1) + Duration::milliseconds(1));
        let origin = catalog
            .load(&store, &source, Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(origin, CatalogOrigin::Network);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_catalog_empty() {
        let store = MemoryStore::<Vec<RawCoin>>::new();
        let source = MockSource::failing();
        let mut catalog = Catalog::new();

        let result = catalog.load(&store, &source, Duration::hours(1)).await;

        assert!(matches!(
            result,
            Err(TrackerError::TransientFetchFailure { .. })
        ));
        assert!(catalog.is_empty());
        assert!(store.get(CATALOG_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_prior_catalog() {
        let store = MemoryStore::<Vec<RawCoin>>::new();
        let mut catalog = Catalog::new();
        catalog
            .load(&store, &MockSource::ok(sample_raw()), Duration::hours(1))
            .await
            .unwrap();

        let result = catalog
            .reload(&store, &MockSource::failing(), Duration::hours(1))
            .await;

        assert!(result.is_err());
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_cached_snapshot() {
        let store = MemoryStore::<Vec<RawCoin>>::new();
        let mut catalog = Catalog::new();
        catalog
            .load(&store, &MockSource::ok(sample_raw()), Duration::hours(1))
            .await
            .unwrap();

        let result = catalog
            .reload(&store, &MockSource::failing(), Duration::hours(1))
            .await;

        assert!(result.is_err());
        assert_eq!(store.get(CATALOG_KEY).await, Some(sample_raw()));

        // A later start inside the TTL window is still served from cache.
        let source = MockSource::ok(vec![]);
        let origin = Catalog::new()
            .load(&store, &source, Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(origin, CatalogOrigin::Cache);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reload_bypasses_and_overwrites_cache() {
        let store = MemoryStore::<Vec<RawCoin>>::new();
        store
            .put(CATALOG_KEY, sample_raw(), Duration::hours(1))
            .await;
        let fresh = vec![raw_coin("solana", "sol", "Solana", 150.0)];
        let source = MockSource::ok(fresh.clone());
        let mut catalog = Catalog::new();

        let origin = catalog
            .reload(&store, &source, Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(origin, CatalogOrigin::Network);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(CATALOG_KEY).await, Some(fresh));
        assert!(catalog.contains("solana"));
    }
}
