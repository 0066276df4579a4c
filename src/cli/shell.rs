//! Line-oriented interactive session.

use super::{coins, report, ui};
use crate::core::error::TrackerError;
use crate::core::favorites::{ToggleOrigin, ToggleOutcome};
use crate::core::filter::SearchField;
use crate::core::report::REPORT_PERIODS;
use crate::core::session::Session;
use anyhow::{Result, anyhow, bail};
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
Commands:
  list                          show all coins
  search [id|name|symbol] [term] filter coins (default field: symbol)
  info <id>                     show details for one coin
  star <id>                     add or remove a favorite
  replace <favorite> <id>       evict a favorite to make room for <id>
  cancel                        abandon a pending replacement
  favorites                     show the favorites summary
  report                        open the price history report
  period <days>                 change the report period
  currency <USD|EUR|ILS>        change the report currency
  close                         close the report
  reload                        refetch the catalog and exchange rates
  help                          show this message
  quit                          leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Search { term: String, field: Option<String> },
    Info(String),
    Star(String),
    Replace { evict: String, candidate: String },
    Cancel,
    Favorites,
    Report,
    Period(u32),
    Currency(String),
    Close,
    Reload,
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("Empty command");
        };
        let args: Vec<&str> = words.collect();
        let one = |what: &str| -> Result<String> {
            match args.as_slice() {
                [arg] => Ok(arg.to_string()),
                _ => Err(anyhow!("Usage: {} <{}>", verb, what)),
            }
        };

        let command = match verb.to_lowercase().as_str() {
            "list" | "ls" => ShellCommand::List,
            "search" | "find" => match args.as_slice() {
                // A leading field name only counts as one when a term follows.
                [field, rest @ ..] if !rest.is_empty() && field.parse::<SearchField>().is_ok() => {
                    ShellCommand::Search {
                        term: rest.join(" "),
                        field: Some(field.to_string()),
                    }
                }
                _ => ShellCommand::Search {
                    term: args.join(" "),
                    field: None,
                },
            },
            "info" => ShellCommand::Info(one("id")?),
            "star" | "fav" => ShellCommand::Star(one("id")?),
            "replace" => match args.as_slice() {
                [evict, candidate] => ShellCommand::Replace {
                    evict: evict.to_string(),
                    candidate: candidate.to_string(),
                },
                _ => bail!("Usage: replace <favorite> <id>"),
            },
            "cancel" => ShellCommand::Cancel,
            "favorites" | "favs" => ShellCommand::Favorites,
            "report" => ShellCommand::Report,
            "period" => {
                let days = one("days")?;
                ShellCommand::Period(
                    days.parse()
                        .map_err(|_| anyhow!("Not a number of days: {}", days))?,
                )
            }
            "currency" => ShellCommand::Currency(one("code")?),
            "close" => ShellCommand::Close,
            "reload" => ShellCommand::Reload,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => bail!("Unknown command: {} (type `help`)", other),
        };
        Ok(command)
    }
}

/// What the loop should do after a command ran.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue(String),
    Quit,
}

/// Runs one command against the session and returns the text to show.
/// Domain errors are rendered into the output, never returned.
pub async fn execute(session: &mut Session, command: ShellCommand) -> Step {
    debug!(?command, "Executing shell command");
    let output = match dispatch(session, command).await {
        Ok(Some(output)) => output,
        Ok(None) => return Step::Quit,
        Err(e) => ui::style_text(&e.to_string(), ui::StyleType::Error),
    };
    let notices = session.take_notices();
    if notices.is_empty() {
        Step::Continue(output)
    } else {
        Step::Continue(format!("{}\n{}", ui::format_notices(&notices), output))
    }
}

async fn dispatch(
    session: &mut Session,
    command: ShellCommand,
) -> Result<Option<String>, TrackerError> {
    let output = match command {
        ShellCommand::List => coins::render_coin_table(
            session.catalog().all(),
            session.favorites(),
            session.rates(),
        ),
        ShellCommand::Search { term, field } => {
            let field = field.unwrap_or_else(|| "symbol".to_string());
            let found = session.on_search(&term, &field)?;
            coins::render_coin_table(found, session.favorites(), session.rates())
        }
        ShellCommand::Info(id) => {
            let coin = session
                .catalog()
                .get(&id)
                .ok_or_else(|| TrackerError::UnknownCoin(id.clone()))?;
            coins::render_coin_info(coin, session.is_favorite(&id), session.rates())
        }
        ShellCommand::Star(id) => {
            let outcome = session
                .on_toggle_favorite(&id, ToggleOrigin::PrimaryList)
                .await?;
            let message = match outcome {
                ToggleOutcome::Added => format!("Added {id} to favorites"),
                ToggleOutcome::Removed => format!("Removed {id} from favorites"),
                ToggleOutcome::ReplacementRequired { candidate, current } => {
                    return Ok(Some(format!(
                        "{}\nCurrent favorites: {}\nUse `replace <favorite> {}` or `cancel`.",
                        ui::style_text(
                            "You can track at most five favorites.",
                            ui::StyleType::Notice
                        ),
                        current.join(", "),
                        candidate
                    )));
                }
            };
            with_summary(session, message)
        }
        ShellCommand::Replace { evict, candidate } => {
            session.on_replace(&evict, &candidate).await?;
            with_summary(session, format!("Replaced {evict} with {candidate}"))
        }
        ShellCommand::Cancel => match session.on_cancel_replacement() {
            Some(candidate) => format!("Cancelled adding {candidate}"),
            None => ui::style_text("Nothing to cancel", ui::StyleType::Subtle),
        },
        ShellCommand::Favorites => ui::style_text(session.summary(), ui::StyleType::Label),
        ShellCommand::Report => report::open_report(session).await,
        ShellCommand::Period(days) => {
            session.on_period_change(days).await?;
            let mut message = format!("Report period set to {days} days");
            if !REPORT_PERIODS.contains(&days) {
                message.push_str(&ui::style_text(
                    " (not one of the usual periods)",
                    ui::StyleType::Subtle,
                ));
            }
            with_open_report(session, message)
        }
        ShellCommand::Currency(code) => {
            session.on_currency_change(&code).await?;
            let message = format!("Report currency set to {}", session.currency());
            with_open_report(session, message)
        }
        ShellCommand::Close => {
            session.on_close_report();
            "Report closed".to_string()
        }
        ShellCommand::Reload => {
            session.on_reload().await?;
            with_summary(
                session,
                format!("Reloaded {} coins", session.catalog().len()),
            )
        }
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Quit => return Ok(None),
    };
    Ok(Some(output))
}

fn with_summary(session: &Session, message: String) -> String {
    let message = format!(
        "{message}\n{}",
        ui::style_text(session.summary(), ui::StyleType::Label)
    );
    with_open_report(session, message)
}

/// Appends the current report when one is open, since it was rebuilt.
fn with_open_report(session: &Session, message: String) -> String {
    match session.report() {
        Some(built) if session.is_report_open() => {
            format!("{message}\n\n{}", report::render_report(built))
        }
        _ => message,
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run_shell(session: &mut Session) -> Result<()> {
    println!(
        "{}\n{}",
        ui::style_text(session.summary(), ui::StyleType::Title),
        ui::style_text("Type `help` for a list of commands.", ui::StyleType::Subtle)
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<ShellCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                continue;
            }
        };
        match execute(session, command).await {
            Step::Continue(output) => println!("{output}"),
            Step::Quit => break,
        }
    }
    Ok(())
}
