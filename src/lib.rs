pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::{coins, report, shell, ui};
use crate::core::clock::SystemClock;
use crate::core::config::AppConfig;
use crate::core::session::{Providers, Session};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Coins,
    Search {
        term: String,
        field: String,
    },
    Report {
        period: Option<u32>,
        currency: Option<String>,
    },
    Shell,
}

/// Builds the provider adapters named in the configuration.
pub fn build_providers(config: &AppConfig) -> Providers {
    let coingecko_url = config
        .providers
        .coingecko
        .as_ref()
        .map_or("https://api.coingecko.com", |p| &p.base_url);
    let frankfurter_url = config
        .providers
        .frankfurter
        .as_ref()
        .map_or("https://api.frankfurter.app", |p| &p.base_url);
    let cryptocompare_url = config
        .providers
        .cryptocompare
        .as_ref()
        .map_or("https://min-api.cryptocompare.com", |p| &p.base_url);

    Providers {
        catalog: Arc::new(providers::coingecko::CoinGeckoProvider::new(coingecko_url)),
        rates: Arc::new(providers::frankfurter::FrankfurterProvider::new(
            frankfurter_url,
        )),
        history: Arc::new(providers::cryptocompare::CryptoCompareProvider::new(
            cryptocompare_url,
        )),
    }
}

/// Starts a session from configuration: opens the catalog cache, loads the
/// catalog and rates, applies the report defaults and seeds favorites.
pub async fn start_session(config: &AppConfig) -> Result<Session> {
    let data_path = config
        .default_data_path()
        .inspect_err(|e| warn!("No data directory: {:#}", e))
        .ok();
    let store = store::open_catalog_store(data_path.as_deref(), Arc::new(SystemClock));

    let catalog_ttl = config.catalog_ttl()?;
    let mut session = Session::start(build_providers(config), store, catalog_ttl).await;
    session.set_report_defaults(config.report.period_days, &config.currency)?;
    session.seed_favorites(&config.favorites).await;
    Ok(session)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Coin tracker starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let mut session = start_session(&config).await?;
    print_notices(&mut session);

    match command {
        AppCommand::Coins => {
            println!(
                "{}\n\n{}",
                ui::style_text(session.summary(), ui::StyleType::Title),
                coins::render_coin_table(
                    session.catalog().all(),
                    session.favorites(),
                    session.rates()
                )
            );
        }
        AppCommand::Search { term, field } => {
            let found = session.on_search(&term, &field)?;
            println!(
                "{}",
                coins::render_coin_table(found, session.favorites(), session.rates())
            );
        }
        AppCommand::Report { period, currency } => {
            if let Some(period) = period {
                session.on_period_change(period).await?;
            }
            if let Some(currency) = currency {
                session.on_currency_change(&currency).await?;
            }
            let output = report::open_report(&mut session).await;
            print_notices(&mut session);
            println!("{output}");
        }
        AppCommand::Shell => shell::run_shell(&mut session).await?,
    }
    Ok(())
}

fn print_notices(session: &mut Session) {
    let notices = session.take_notices();
    if !notices.is_empty() {
        eprintln!("{}", ui::format_notices(&notices));
    }
}
