//! Domain error taxonomy for the tracker core.
//!
//! Cache misses and a full favorites set are not errors: the
//! first is `Option::None`, the second a [`ToggleOutcome`] variant.
//!
//! [`ToggleOutcome`]: crate::core::favorites::ToggleOutcome

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("There was an error retrieving the information from {provider}: {message}")]
    TransientFetchFailure { provider: String, message: String },

    #[error("Unknown search field: '{0}' (expected one of: id, name, symbol)")]
    InvalidFilterField(String),

    #[error("Coin not found in catalog: {0}")]
    UnknownCoin(String),

    #[error("Cannot toggle {id}: {reason}")]
    InvalidToggle { id: String, reason: String },

    #[error("No replacement is pending for {0}")]
    NoPendingReplacement(String),

    #[error("A replacement for {0} is pending; pick a favorite to evict or cancel first")]
    ReplacementInProgress(String),

    #[error("{0} is not a favorite")]
    NotAFavorite(String),

    #[error("Invalid report period: {0} days")]
    InvalidPeriod(u32),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

impl TrackerError {
    pub fn fetch_failure(provider: &str, err: &anyhow::Error) -> Self {
        TrackerError::TransientFetchFailure {
            provider: provider.to_string(),
            message: format!("{err:#}"),
        }
    }
}
