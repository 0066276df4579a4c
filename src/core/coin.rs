//! Coin records as delivered by the catalog provider and as held by the catalog.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A coin exactly as the catalog provider sends it. This is what gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image_url: Option<String>,
    pub current_price_usd: Option<f64>,
}

impl Coin {
    /// Display label used by reports, e.g. `Bitcoin (btc)`.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.symbol)
    }
}

impl From<&RawCoin> for Coin {
    fn from(raw: &RawCoin) -> Self {
        Coin {
            id: raw.id.clone(),
            symbol: raw.symbol.clone(),
            name: raw.name.clone(),
            image_url: raw.image.clone(),
            current_price_usd: raw.current_price,
        }
    }
}

/// Supplies a full snapshot of the coin catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_coins(&self) -> Result<Vec<RawCoin>>;
}
