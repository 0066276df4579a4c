use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinwatch::cli::setup::setup;
use coinwatch::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinwatch::AppCommand {
    fn from(cmd: Commands) -> coinwatch::AppCommand {
        match cmd {
            Commands::Coins => coinwatch::AppCommand::Coins,
            Commands::Search { term, field } => coinwatch::AppCommand::Search { term, field },
            Commands::Report { period, currency } => {
                coinwatch::AppCommand::Report { period, currency }
            }
            Commands::Shell => coinwatch::AppCommand::Shell,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List all coins with their prices
    Coins,
    /// Search coins by id, name or symbol
    Search {
        /// Text to look for, case-insensitive
        term: String,
        /// Field to search in: id, name or symbol
        #[arg(short, long, default_value = "symbol")]
        field: String,
    },
    /// Show price history for the configured favorites
    Report {
        /// Number of days of history
        #[arg(short, long)]
        period: Option<u32>,
        /// Report currency: USD, EUR or ILS
        #[arg(long)]
        currency: Option<String>,
    },
    /// Start an interactive session
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => coinwatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
