//! A user session: the owned state of one run and the command handlers the
//! UI layer drives it with.

use crate::core::cache::TtlStore;
use crate::core::catalog::Catalog;
use crate::core::coin::{CatalogSource, Coin, RawCoin};
use crate::core::currency::{CurrencyRateProvider, ExchangeRateTable, normalize_report_currency};
use crate::core::error::TrackerError;
use crate::core::favorites::{FavoritesSet, ToggleOrigin, ToggleOutcome, summary_line};
use crate::core::filter::{SearchField, search};
use crate::core::report::{
    DEFAULT_PERIOD_DAYS, HistoricalPriceProvider, Report, ReportAggregator, Versioned,
};
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

static NO_REPORT: Report = Report::Empty;

/// External collaborators a session fetches through.
#[derive(Clone)]
pub struct Providers {
    pub catalog: Arc<dyn CatalogSource>,
    pub rates: Arc<dyn CurrencyRateProvider>,
    pub history: Arc<dyn HistoricalPriceProvider>,
}

pub struct Session {
    catalog: Catalog,
    favorites: FavoritesSet,
    favorites_rx: watch::Receiver<Vec<String>>,
    summary: String,
    rates: ExchangeRateTable,
    aggregator: ReportAggregator,
    store: Arc<dyn TtlStore<Vec<RawCoin>>>,
    providers: Providers,
    catalog_ttl: Duration,
    period_days: u32,
    currency: String,
    report_open: bool,
    report: Option<Versioned<Report>>,
    notices: Vec<String>,
}

impl Session {
    /// Loads the catalog (cache first) and exchange rates. Failures do not
    /// abort the session; they are queued as notices.
    pub async fn start(
        providers: Providers,
        store: Arc<dyn TtlStore<Vec<RawCoin>>>,
        catalog_ttl: Duration,
    ) -> Self {
        let favorites = FavoritesSet::new();
        let favorites_rx = favorites.subscribe();
        let mut session = Session {
            catalog: Catalog::new(),
            favorites,
            favorites_rx,
            summary: String::new(),
            rates: ExchangeRateTable::new(),
            aggregator: ReportAggregator::new(providers.history.clone()),
            store,
            providers,
            catalog_ttl,
            period_days: DEFAULT_PERIOD_DAYS,
            currency: "USD".to_string(),
            report_open: false,
            report: None,
            notices: Vec::new(),
        };

        if let Err(e) = session
            .catalog
            .load(
                session.store.as_ref(),
                session.providers.catalog.as_ref(),
                session.catalog_ttl,
            )
            .await
        {
            session.notices.push(e.to_string());
        }
        if let Err(e) = session.rates.refresh(session.providers.rates.as_ref()).await {
            session.notices.push(e.to_string());
        }
        session.summary = summary_line(&session.catalog, session.favorites.ids());
        info!("Session started with {} coins", session.catalog.len());
        session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn favorites(&self) -> &[String] {
        self.favorites.ids()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn pending_replacement(&self) -> Option<&str> {
        self.favorites.pending_candidate()
    }

    pub fn rates(&self) -> &ExchangeRateTable {
        &self.rates
    }

    /// The favorites summary line, kept in step with the favorites set.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn period_days(&self) -> u32 {
        self.period_days
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_report_open(&self) -> bool {
        self.report_open
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref().map(|built| &built.value)
    }

    /// User-facing messages accumulated since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Sets the initial report controls. Does not build anything.
    pub fn set_report_defaults(&mut self, period_days: u32, currency: &str) -> Result<(), TrackerError> {
        self.period_days = validate_period(period_days)?;
        self.currency = normalize_report_currency(currency)?;
        Ok(())
    }

    /// Pins each id in order through the regular toggle path. Ids that cannot
    /// be pinned are reported as notices.
    pub async fn seed_favorites(&mut self, ids: &[String]) {
        for id in ids {
            if self.favorites.contains(id) {
                continue;
            }
            match self.favorites.toggle(&self.catalog, id, ToggleOrigin::PrimaryList) {
                Ok(ToggleOutcome::ReplacementRequired { candidate, .. }) => {
                    self.favorites.cancel_replacement();
                    self.notices
                        .push(format!("Favorites are full, skipping {candidate}"));
                }
                Ok(_) => {}
                Err(e) => self.notices.push(e.to_string()),
            }
        }
        self.sync_favorites().await;
    }

    pub async fn on_toggle_favorite(
        &mut self,
        id: &str,
        origin: ToggleOrigin,
    ) -> Result<ToggleOutcome, TrackerError> {
        let outcome = self.favorites.toggle(&self.catalog, id, origin)?;
        self.sync_favorites().await;
        Ok(outcome)
    }

    pub async fn on_replace(&mut self, evict_id: &str, candidate_id: &str) -> Result<(), TrackerError> {
        self.favorites.replace(&self.catalog, evict_id, candidate_id)?;
        self.sync_favorites().await;
        Ok(())
    }

    pub fn on_cancel_replacement(&mut self) -> Option<String> {
        self.favorites.cancel_replacement()
    }

    pub fn on_search(&self, term: &str, field: &str) -> Result<Vec<&Coin>, TrackerError> {
        let field: SearchField = field.parse()?;
        Ok(search(&self.catalog, term, field).collect())
    }

    pub async fn on_open_report(&mut self) -> &Report {
        self.on_open_report_with_progress(&|| ()).await
    }

    pub async fn on_open_report_with_progress(&mut self, on_settled: &(dyn Fn() + Sync)) -> &Report {
        self.report_open = true;
        self.rebuild_report(on_settled).await;
        self.report
            .as_ref()
            .map_or(&NO_REPORT, |built| &built.value)
    }

    pub fn on_close_report(&mut self) {
        self.report_open = false;
        self.report = None;
    }

    pub async fn on_period_change(&mut self, period_days: u32) -> Result<(), TrackerError> {
        self.period_days = validate_period(period_days)?;
        if self.report_open {
            self.rebuild_report(&|| ()).await;
        }
        Ok(())
    }

    pub async fn on_currency_change(&mut self, currency: &str) -> Result<(), TrackerError> {
        self.currency = normalize_report_currency(currency)?;
        if self.report_open {
            self.rebuild_report(&|| ()).await;
        }
        Ok(())
    }

    /// Fetches the catalog and exchange rates again, bypassing the cache.
    pub async fn on_reload(&mut self) -> Result<(), TrackerError> {
        self.catalog
            .reload(
                self.store.as_ref(),
                self.providers.catalog.as_ref(),
                self.catalog_ttl,
            )
            .await?;
        let dropped = self.favorites.retain_known(&self.catalog);
        if !dropped.is_empty() {
            self.notices.push(format!(
                "Removed favorites no longer listed: {}",
                dropped.join(", ")
            ));
        }
        if let Err(e) = self.rates.refresh(self.providers.rates.as_ref()).await {
            self.notices.push(e.to_string());
        }
        // Prices changed even if the favorites did not.
        self.summary = summary_line(&self.catalog, self.favorites.ids());
        self.sync_favorites().await;
        Ok(())
    }

    async fn sync_favorites(&mut self) {
        if !self.favorites_rx.has_changed().unwrap_or(false) {
            return;
        }
        let ids = self.favorites_rx.borrow_and_update().clone();
        self.summary = summary_line(&self.catalog, &ids);
        debug!("Favorites summary: {}", self.summary);
        if self.report_open {
            self.rebuild_report(&|| ()).await;
        }
    }

    async fn rebuild_report(&mut self, on_settled: &(dyn Fn() + Sync)) {
        let built = self
            .aggregator
            .build_with_progress(
                &self.catalog,
                self.favorites.ids(),
                self.period_days,
                &self.currency,
                on_settled,
            )
            .await;
        if self.aggregator.is_current(built.generation) {
            self.report = Some(built);
        } else {
            debug!("Discarding stale report generation {}", built.generation);
        }
    }
}

fn validate_period(period_days: u32) -> Result<u32, TrackerError> {
    if period_days == 0 {
        return Err(TrackerError::InvalidPeriod(period_days));
    }
    Ok(period_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::tests::{MockSource, raw_coin};
    use crate::core::report::tests::{Canned, MockHistory};
    use crate::store::memory::MemoryStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FixedRates;

    #[async_trait]
    impl CurrencyRateProvider for FixedRates {
        async fn get_rates(&self, _from: &str, _to: &[&str]) -> Result<HashMap<String, f64>> {
            Ok(HashMap::from([("EUR".to_string(), 0.5)]))
        }
    }

    struct DownRates;

    #[async_trait]
    impl CurrencyRateProvider for DownRates {
        async fn get_rates(&self, _from: &str, _to: &[&str]) -> Result<HashMap<String, f64>> {
            Err(anyhow!("service unavailable"))
        }
    }

    fn coins() -> Vec<RawCoin> {
        vec![
            raw_coin("bitcoin", "btc", "Bitcoin", 64000.0),
            raw_coin("ethereum", "eth", "Ethereum", 3000.0),
            raw_coin("mantle", "mnt", "Mantle", 0.8),
        ]
    }

    fn history() -> Arc<MockHistory> {
        Arc::new(MockHistory::new(vec![
            ("btc", Canned::Points(vec![60000.0, 61000.0])),
            ("eth", Canned::Points(vec![2900.0, 3000.0])),
        ]))
    }

    async fn session_with(source: MockSource, history: Arc<MockHistory>) -> Session {
        let providers = Providers {
            catalog: Arc::new(source),
            rates: Arc::new(FixedRates),
            history,
        };
        Session::start(
            providers,
            Arc::new(MemoryStore::<Vec<RawCoin>>::new()),
            Duration::hours(1),
        )
        .await
    }

    fn series_ids(report: &Report) -> Vec<String> {
        match report {
            Report::Empty => vec![],
            Report::Dataset(dataset) => dataset.series.iter().map(|s| s.coin_id.clone()).collect(),
        }
    }

    #[tokio::test]
    async fn test_start_with_failed_catalog_is_empty_with_notice() {
        let mut session = session_with(MockSource::failing(), history()).await;

        assert!(session.catalog().is_empty());
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("catalog provider"));
        assert!(session.take_notices().is_empty());

        assert!(session.on_search("btc", "symbol").unwrap().is_empty());
        assert_eq!(session.on_open_report().await, &Report::Empty);
    }

    #[tokio::test]
    async fn test_failed_rates_are_a_notice() {
        let providers = Providers {
            catalog: Arc::new(MockSource::ok(coins())),
            rates: Arc::new(DownRates),
            history: history(),
        };
        let mut session = Session::start(
            providers,
            Arc::new(MemoryStore::<Vec<RawCoin>>::new()),
            Duration::hours(1),
        )
        .await;

        assert_eq!(session.catalog().len(), 3);
        assert!(session.rates().is_empty());
        assert_eq!(session.take_notices().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_updates_summary() {
        let mut session = session_with(MockSource::ok(coins()), history()).await;
        assert_eq!(session.summary(), "Welcome to the Cryptocurrency tracker!");

        session
            .on_toggle_favorite("bitcoin", ToggleOrigin::PrimaryList)
            .await
            .unwrap();
        assert_eq!(session.summary(), "Favorites: btc $64000.00");

        session
            .on_toggle_favorite("bitcoin", ToggleOrigin::PrimaryList)
            .await
            .unwrap();
        assert_eq!(session.summary(), "Welcome to the Cryptocurrency tracker!");
    }

    #[tokio::test]
    async fn test_open_report_skips_unsupported_favorite() {
        let mut session = session_with(MockSource::ok(coins()), history()).await;
        session
            .seed_favorites(&["bitcoin".to_string(), "mantle".to_string()])
            .await;

        let report = session.on_open_report().await;
        assert_eq!(series_ids(report), vec!["bitcoin"]);
    }

    #[tokio::test]
    async fn test_favorite_change_rebuilds_open_report() {
        let mut session = session_with(MockSource::ok(coins()), history()).await;
        session.seed_favorites(&["bitcoin".to_string()]).await;
        session.on_open_report().await;

        session
            .on_toggle_favorite("ethereum", ToggleOrigin::PrimaryList)
            .await
            .unwrap();

        assert_eq!(
            series_ids(session.report().unwrap()),
            vec!["bitcoin", "ethereum"]
        );
    }

    #[tokio::test]
    async fn test_control_changes_refetch_only_while_open() {
        let provider = history();
        let mut session = session_with(MockSource::ok(coins()), provider.clone()).await;
        session.seed_favorites(&["bitcoin".to_string()]).await;

        session.on_period_change(7).await.unwrap();
        assert!(provider.requests.lock().unwrap().is_empty());

        session.on_open_report().await;
        session.on_currency_change("eur").await.unwrap();
        session.on_period_change(90).await.unwrap();

        let requests = provider.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                ("btc".to_string(), "USD".to_string(), 7),
                ("btc".to_string(), "EUR".to_string(), 7),
                ("btc".to_string(), "EUR".to_string(), 90),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_controls_are_rejected() {
        let mut session = session_with(MockSource::ok(coins()), history()).await;

        assert_eq!(
            session.on_period_change(0).await,
            Err(TrackerError::InvalidPeriod(0))
        );
        assert!(session.on_currency_change("doge").await.is_err());
        assert_eq!(session.period_days(), DEFAULT_PERIOD_DAYS);
        assert_eq!(session.currency(), "USD");
    }

    #[tokio::test]
    async fn test_invalid_search_field_is_rejected() {
        let session = session_with(MockSource::ok(coins()), history()).await;
        assert_eq!(
            session.on_search("btc", "image"),
            Err(TrackerError::InvalidFilterField("image".to_string()))
        );
    }

    #[tokio::test]
    async fn test_seed_beyond_capacity_is_a_notice() {
        let raw: Vec<RawCoin> = (0..7)
            .map(|i| raw_coin(&format!("c{i}"), &format!("s{i}"), "Coin", 1.0))
            .collect();
        let mut session = session_with(MockSource::ok(raw), history()).await;
        let ids: Vec<String> = (0..7).map(|i| format!("c{i}")).collect();

        session.seed_favorites(&ids).await;

        assert_eq!(session.favorites().len(), 5);
        assert!(session.pending_replacement().is_none());
        assert_eq!(session.take_notices().len(), 2);
    }

    #[tokio::test]
    async fn test_reload_drops_orphaned_favorites() {
        let mut session = session_with(MockSource::ok(coins()), history()).await;
        session
            .seed_favorites(&["bitcoin".to_string(), "mantle".to_string()])
            .await;
        session.providers.catalog = Arc::new(MockSource::ok(vec![raw_coin(
            "bitcoin", "btc", "Bitcoin", 70000.0,
        )]));

        session.on_reload().await.unwrap();

        assert_eq!(session.favorites(), &["bitcoin"]);
        assert_eq!(session.summary(), "Favorites: btc $70000.00");
        assert_eq!(session.take_notices().len(), 1);
    }

    #[tokio::test]
    async fn test_close_report_clears_it() {
        let mut session = session_with(MockSource::ok(coins()), history()).await;
        session.seed_favorites(&["bitcoin".to_string()]).await;
        session.on_open_report().await;
        session.on_close_report();

        assert!(!session.is_report_open());
        assert!(session.report().is_none());
    }
}
