use crate::core::catalog::CATALOG_TTL_MS;
use crate::core::report::DEFAULT_PERIOD_DAYS;
use anyhow::{Context, Result};
use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FrankfurterProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CryptoCompareProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<CoinGeckoProviderConfig>,
    pub frankfurter: Option<FrankfurterProviderConfig>,
    pub cryptocompare: Option<CryptoCompareProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(CoinGeckoProviderConfig {
                base_url: "https://api.coingecko.com".to_string(),
            }),
            frankfurter: Some(FrankfurterProviderConfig {
                base_url: "https://api.frankfurter.app".to_string(),
            }),
            cryptocompare: Some(CryptoCompareProviderConfig {
                base_url: "https://min-api.cryptocompare.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_period_days")]
    pub period_days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            period_days: DEFAULT_PERIOD_DAYS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_catalog_ttl_minutes")]
    pub catalog_ttl_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            catalog_ttl_minutes: default_catalog_ttl_minutes(),
        }
    }
}

fn default_period_days() -> u32 {
    DEFAULT_PERIOD_DAYS
}

fn default_catalog_ttl_minutes() -> i64 {
    CATALOG_TTL_MS / 60_000
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            favorites: Vec::new(),
            report: ReportConfig::default(),
            cache: CacheConfig::default(),
            providers: ProvidersConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinwatch", "coinwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "coinwatch", "coinwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn catalog_ttl(&self) -> Result<Duration> {
        Duration::try_minutes(self.cache.catalog_ttl_minutes).with_context(|| {
            format!(
                "cache.catalog_ttl_minutes is out of range: {}",
                self.cache.catalog_ttl_minutes
            )
        })
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
