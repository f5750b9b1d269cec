use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::error;
use std::process::ExitCode;

use price_backfill_core::errors::CoreError;
use price_backfill_core::models::settings::Settings;
use price_backfill_core::storage::sqlite::SqliteStorage;
use price_backfill_core::storage::traits::PriceRepository;
use price_backfill_core::PriceBackfill;

#[derive(Parser, Debug)]
#[command(
    name = "price-backfill",
    about = "Backfill historical closing prices for a portfolio's holdings"
)]
struct Cli {
    /// SQLite database path (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and store missing prices for every ticker of a portfolio
    Backfill {
        #[arg(long, required_unless_present = "portfolio_name", conflicts_with = "portfolio_name")]
        portfolio_id: Option<i64>,
        #[arg(long)]
        portfolio_name: Option<String>,
        /// Run date (YYYY-MM-DD); prices on or after it are never stored
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Price provider: yahoo or alphavantage (overrides PRICE_PROVIDER)
        #[arg(long)]
        provider: Option<String>,
        /// Provider timeout in seconds (overrides FETCH_TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Create the database tables if missing
    InitDb,
    /// Print the stored prices of a ticker
    Prices { ticker: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            exit_code(&e)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    match cli.command {
        Command::Backfill {
            portfolio_id,
            portfolio_name,
            today,
            provider,
            timeout,
        } => {
            let settings = load_settings(
                cli.database.as_deref(),
                provider.as_deref(),
                timeout,
            )?;
            let backfill = PriceBackfill::from_settings(&settings)?;

            let portfolio_id = match (portfolio_id, portfolio_name) {
                (Some(id), _) => id,
                (None, Some(name)) => backfill.portfolio_id(&name)?,
                (None, None) => {
                    return Err(CoreError::Config(
                        "one of --portfolio-id or --portfolio-name is required".into(),
                    ))
                }
            };

            let summary = match today {
                Some(today) => backfill.backfill_on(portfolio_id, today).await?,
                None => backfill.backfill(portfolio_id).await?,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::InitDb => {
            let settings = load_settings(cli.database.as_deref(), None, None)?;
            let storage = SqliteStorage::open(&settings.database_path, settings.pool_size)?;
            storage.initialize_schema()?;
            println!("Schema ready in {}", settings.database_path);
        }
        Command::Prices { ticker } => {
            let settings = load_settings(cli.database.as_deref(), None, None)?;
            let storage = SqliteStorage::open(&settings.database_path, settings.pool_size)?;
            storage.initialize_schema()?;
            let prices = storage.prices_for(&ticker)?;
            println!("{}", serde_json::to_string_pretty(&prices)?);
        }
    }
    Ok(())
}

/// Environment (and `.env`) settings with command-line flags taking precedence.
fn load_settings(
    database: Option<&str>,
    provider: Option<&str>,
    timeout: Option<u64>,
) -> Result<Settings, CoreError> {
    Settings::from_env_with(|key| match key {
        "DATABASE_URL" => database.map(str::to_string),
        "PRICE_PROVIDER" => provider.map(str::to_string),
        "FETCH_TIMEOUT_SECS" => timeout.map(|t| t.to_string()),
        _ => None,
    })
}

fn exit_code(err: &CoreError) -> ExitCode {
    let code: u8 = match err {
        CoreError::Config(_) => 2,
        e if e.is_storage() => 3,
        CoreError::PortfolioNotFound(_) => 4,
        _ => 1,
    };
    ExitCode::from(code)
}
