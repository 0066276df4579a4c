use crate::core::report::{HistoricalPriceProvider, HistoryPoint, PriceHistory};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::USER_AGENT;

/// Daily close history from the CryptoCompare `histoday` endpoint.
pub struct CryptoCompareProvider {
    base_url: String,
}

impl CryptoCompareProvider {
    pub fn new(base_url: &str) -> Self {
        CryptoCompareProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistodayResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Data", default)]
    data: Option<HistodayData>,
}

#[derive(Debug, Deserialize)]
struct HistodayData {
    #[serde(rename = "Data", default)]
    points: Vec<HistodayPoint>,
}

#[derive(Debug, Deserialize)]
struct HistodayPoint {
    time: i64,
    close: f64,
}

#[async_trait]
impl HistoricalPriceProvider for CryptoCompareProvider {
    #[instrument(name = "CryptoCompareHistoryFetch", skip(self))]
    async fn fetch_history(
        &self,
        symbol: &str,
        currency: &str,
        days: u32,
    ) -> Result<PriceHistory> {
        let fsym = symbol.to_uppercase();
        let tsym = currency.to_uppercase();
        let url = format!(
            "{}/data/v2/histoday?fsym={}&tsym={}&limit={}",
            self.base_url, fsym, tsym, days
        );
        debug!("Requesting price history from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, fsym))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                fsym
            ));
        }

        let text = response.text().await?;
        let data: HistodayResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", fsym, e))?;

        if data.response != "Success" {
            debug!("History not supported for {}-{}: {}", fsym, tsym, data.message);
            return Ok(PriceHistory::NotSupported);
        }

        let mut points: Vec<HistoryPoint> = data
            .data
            .map(|d| d.points)
            .unwrap_or_default()
            .into_iter()
            .map(|p| HistoryPoint {
                timestamp: p.time,
                close: p.close,
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);

        // `limit=N` yields N+1 days; keep the most recent `days`.
        let excess = points.len().saturating_sub(days as usize);
        points.drain(..excess);
        Ok(PriceHistory::Available(points))
    }
}
