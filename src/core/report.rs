//! Historical price report for the favorites.
//!
//! Each favorite's history is fetched on its own; a favorite whose provider
//! fails, answers "not supported" or returns nothing is simply left out of the
//! report. The first favorite with data defines the date axis.

use crate::core::catalog::Catalog;
use crate::core::coin::Coin;
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Report periods offered to the user, in days.
pub const REPORT_PERIODS: [u32; 7] = [7, 14, 30, 90, 120, 270, 365];

pub const DEFAULT_PERIOD_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    /// Epoch seconds of the day.
    pub timestamp: i64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceHistory {
    Available(Vec<HistoryPoint>),
    NotSupported,
}

#[async_trait]
pub trait HistoricalPriceProvider: Send + Sync {
    /// Up to `days` daily closes of `symbol` in `currency`, oldest first.
    async fn fetch_history(&self, symbol: &str, currency: &str, days: u32)
    -> Result<PriceHistory>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineColor {
    Red,
    Green,
    Blue,
    Purple,
    Orange,
}

pub const PALETTE: [LineColor; 5] = [
    LineColor::Red,
    LineColor::Green,
    LineColor::Blue,
    LineColor::Purple,
    LineColor::Orange,
];

impl LineColor {
    pub fn for_position(position: usize) -> Self {
        PALETTE[position % PALETTE.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineColor::Red => "red",
            LineColor::Green => "green",
            LineColor::Blue => "blue",
            LineColor::Purple => "purple",
            LineColor::Orange => "orange",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub coin_id: String,
    pub label: String,
    pub values: Vec<f64>,
    pub color: LineColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDataset {
    pub period_days: u32,
    pub currency: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// No favorite had data for the request.
    Empty,
    Dataset(ReportDataset),
}

/// A value stamped with the generation of the build that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub generation: u64,
    pub value: T,
}

/// Formats an epoch-seconds timestamp as `<day> <month>`, e.g. `5 Mar`.
pub fn day_label(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%-d %b").to_string())
        .unwrap_or_default()
}

pub struct ReportAggregator {
    provider: Arc<dyn HistoricalPriceProvider>,
    generation: AtomicU64,
}

impl ReportAggregator {
    pub fn new(provider: Arc<dyn HistoricalPriceProvider>) -> Self {
        Self {
            provider,
            generation: AtomicU64::new(0),
        }
    }

    /// Generation of the most recently started build.
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a result stamped `generation` is from the latest build.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest_generation()
    }

    pub async fn build(
        &self,
        catalog: &Catalog,
        favorites: &[String],
        period_days: u32,
        currency: &str,
    ) -> Versioned<Report> {
        self.build_with_progress(catalog, favorites, period_days, currency, &|| ())
            .await
    }

    /// Like [`build`](Self::build), calling `on_settled` once per favorite as
    /// its fetch completes.
    pub async fn build_with_progress(
        &self,
        catalog: &Catalog,
        favorites: &[String],
        period_days: u32,
        currency: &str,
        on_settled: &(dyn Fn() + Sync),
    ) -> Versioned<Report> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            generation,
            period_days,
            currency,
            "Building report for {} favorites",
            favorites.len()
        );

        if period_days == 0 {
            return Versioned {
                generation,
                value: Report::Empty,
            };
        }

        let fetches = favorites.iter().map(|id| async move {
            let fetched = self.fetch_series(catalog, id, period_days, currency).await;
            on_settled();
            fetched
        });
        let settled: Vec<(&Coin, Vec<HistoryPoint>)> =
            join_all(fetches).await.into_iter().flatten().collect();

        Versioned {
            generation,
            value: assemble(settled, period_days, currency),
        }
    }

    async fn fetch_series<'a>(
        &self,
        catalog: &'a Catalog,
        id: &str,
        period_days: u32,
        currency: &str,
    ) -> Option<(&'a Coin, Vec<HistoryPoint>)> {
        let Some(coin) = catalog.get(id) else {
            warn!("Favorite {} is not in the catalog, skipping", id);
            return None;
        };
        match self
            .provider
            .fetch_history(&coin.symbol, currency, period_days)
            .await
        {
            Ok(PriceHistory::Available(points)) if !points.is_empty() => Some((coin, points)),
            Ok(PriceHistory::Available(_)) => {
                warn!("Empty price history for {}", coin.symbol);
                None
            }
            Ok(PriceHistory::NotSupported) => {
                debug!("No price history available for {}", coin.symbol);
                None
            }
            Err(e) => {
                warn!("Price history fetch failed for {}: {:#}", coin.symbol, e);
                None
            }
        }
    }
}

fn assemble(settled: Vec<(&Coin, Vec<HistoryPoint>)>, period_days: u32, currency: &str) -> Report {
    let Some((_, axis)) = settled.first() else {
        return Report::Empty;
    };
    let labels: Vec<String> = axis.iter().map(|p| day_label(p.timestamp)).collect();

    let series = settled
        .iter()
        .enumerate()
        .map(|(position, (coin, points))| {
            if points.len() != labels.len() {
                // Series are kept as returned; no alignment by date.
                warn!(
                    "Series for {} has {} points, axis has {}",
                    coin.symbol,
                    points.len(),
                    labels.len()
                );
            }
            ChartSeries {
                coin_id: coin.id.clone(),
                label: coin.display_label(),
                values: points.iter().map(|p| p.close).collect(),
                color: LineColor::for_position(position),
            }
        })
        .collect();

    Report::Dataset(ReportDataset {
        period_days,
        currency: currency.to_string(),
        labels,
        series,
    })
}
