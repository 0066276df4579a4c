//! Currency conversion abstractions

use crate::core::error::TrackerError;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Currency all catalog prices are quoted in.
pub const BASE_CURRENCY: &str = "USD";

/// Currencies a report can be drawn in.
pub const REPORT_CURRENCIES: [&str; 3] = ["USD", "EUR", "ILS"];

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Rates of each of `to` against one unit of `from`.
    async fn get_rates(&self, from: &str, to: &[&str]) -> Result<HashMap<String, f64>>;
}

/// Normalizes a user supplied currency code and checks it is reportable.
pub fn normalize_report_currency(code: &str) -> Result<String, TrackerError> {
    let code = code.trim().to_uppercase();
    if REPORT_CURRENCIES.contains(&code.as_str()) {
        Ok(code)
    } else {
        Err(TrackerError::UnsupportedCurrency(code))
    }
}

/// USD-relative exchange rates. Refreshed best effort: a failed refresh keeps
/// whatever was there before.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRateTable {
    rates: HashMap<String, f64>,
}

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh(
        &mut self,
        provider: &dyn CurrencyRateProvider,
    ) -> Result<(), TrackerError> {
        let targets: Vec<&str> = REPORT_CURRENCIES
            .iter()
            .copied()
            .filter(|code| *code != BASE_CURRENCY)
            .collect();
        match provider.get_rates(BASE_CURRENCY, &targets).await {
            Ok(rates) => {
                debug!("Exchange rates refreshed: {:?}", rates);
                self.rates = rates
                    .into_iter()
                    .map(|(code, rate)| (code.to_uppercase(), rate))
                    .collect();
                Ok(())
            }
            Err(e) => {
                warn!("Keeping previous exchange rates: {:#}", e);
                Err(TrackerError::fetch_failure("the exchange rates provider", &e))
            }
        }
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        let code = code.to_uppercase();
        if code == BASE_CURRENCY {
            return Some(1.0);
        }
        self.rates.get(&code).copied()
    }

    /// Converts a USD amount into `code`, if its rate is known.
    pub fn convert(&self, usd: f64, code: &str) -> Option<f64> {
        self.rate(code).map(|rate| usd * rate)
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
