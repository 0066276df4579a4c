use crate::core::currency::CurrencyRateProvider;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::USER_AGENT;

/// Exchange rates from the Frankfurter (ECB) API.
pub struct FrankfurterProvider {
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new(base_url: &str) -> Self {
        FrankfurterProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl CurrencyRateProvider for FrankfurterProvider {
    async fn get_rates(&self, from: &str, to: &[&str]) -> Result<HashMap<String, f64>> {
        let targets = to.join(",");
        let url = format!("{}/latest?from={}&to={}", self.base_url, from, targets);
        debug!("Requesting exchange rates from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currencies: {}", e, targets))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currencies: {}",
                response.status(),
                targets
            ));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", targets, e))?;

        if let Some(missing) = to.iter().find(|code| !data.rates.contains_key(**code)) {
            return Err(anyhow!("No rate data found for currency: {}", missing));
        }
        Ok(data.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_latest(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("from", "USD"))
            .and(query_param("to", "EUR,ILS"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let body = r#"{"amount": 1.0, "base": "USD", "date": "2024-03-01",
                       "rates": {"EUR": 0.92, "ILS": 3.61}}"#;
        let mock_server = mock_latest(200, body).await;

        let provider = FrankfurterProvider::new(&mock_server.uri());
        let rates = provider.get_rates("USD", &["EUR", "ILS"]).await.unwrap();

        assert_eq!(rates.get("EUR"), Some(&0.92));
        assert_eq!(rates.get("ILS"), Some(&3.61));
    }

    #[tokio::test]
    async fn test_missing_rate_is_error() {
        let body = r#"{"amount": 1.0, "base": "USD", "rates": {"EUR": 0.92}}"#;
        let mock_server = mock_latest(200, body).await;

        let provider = FrankfurterProvider::new(&mock_server.uri());
        let result = provider.get_rates("USD", &["EUR", "ILS"]).await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "No rate data found for currency: ILS"
        );
    }

    #[tokio::test]
    async fn test_rates_api_error_response() {
        let mock_server = mock_latest(500, "").await;

        let provider = FrankfurterProvider::new(&mock_server.uri());
        let result = provider.get_rates("USD", &["EUR", "ILS"]).await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for currencies: EUR,ILS"
        );
    }
}
