use crate::core::coin::{CatalogSource, RawCoin};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::USER_AGENT;

/// Catalog source backed by the CoinGecko markets endpoint.
pub struct CoinGeckoProvider {
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Self {
        CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CatalogSource for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoCatalogFetch", skip(self))]
    async fn fetch_coins(&self) -> Result<Vec<RawCoin>> {
        let url = format!("{}/api/v3/coins/markets?vs_currency=usd", self.base_url);
        debug!("Requesting coin catalog from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for coin catalog", response.status()));
        }

        let coins: Vec<RawCoin> = response
            .json()
            .await
            .context("Failed to parse coin catalog response")?;
        debug!("Received {} coins", coins.len());
        Ok(coins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_markets(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/coins/markets"))
            .and(query_param("vs_currency", "usd"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_successful_catalog_fetch() {
        let body = r#"[
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
             "image": "https://img/btc.png", "current_price": 64000.0, "market_cap_rank": 1},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum",
             "image": "https://img/eth.png", "current_price": 3000.5}
        ]"#;
        let mock_server = mock_markets(200, body).await;

        let provider = CoinGeckoProvider::new(&mock_server.uri());
        let coins = provider.fetch_coins().await.unwrap();

        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].id, "bitcoin");
        assert_eq!(coins[1].current_price, Some(3000.5));
    }

    #[tokio::test]
    async fn test_catalog_http_error() {
        let mock_server = mock_markets(429, "").await;

        let provider = CoinGeckoProvider::new(&mock_server.uri());
        let result = provider.fetch_coins().await;

        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 429 Too Many Requests for coin catalog"
        );
    }

    #[tokio::test]
    async fn test_catalog_malformed_response() {
        let mock_server = mock_markets(200, r#"{"status": "down"}"#).await;

        let provider = CoinGeckoProvider::new(&mock_server.uri());
        let result = provider.fetch_coins().await;

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse coin catalog response")
        );
    }
}
