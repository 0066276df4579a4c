//! Core business logic abstractions

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod coin;
pub mod config;
pub mod currency;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod log;
pub mod report;
pub mod session;

// Re-export main types for cleaner imports
pub use cache::TtlStore;
pub use catalog::Catalog;
pub use coin::{CatalogSource, Coin, RawCoin};
pub use currency::CurrencyRateProvider;
pub use error::TrackerError;
pub use favorites::{FavoritesSet, ToggleOrigin, ToggleOutcome};
pub use filter::SearchField;
pub use report::{HistoricalPriceProvider, Report, ReportAggregator};
pub use session::{Providers, Session};
