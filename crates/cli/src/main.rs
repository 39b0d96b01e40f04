mod config;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use csv_adapter::CsvTableStore;
use discord_adapter::DiscordHistoryProvider;
use journal_core::ports::{ChatHistoryProvider, TabularStore};
use journal_core::{RunSummary, SyncServiceImpl, SyncSettings, TabularExporter, TradeExtractor};
use sheets_adapter::GoogleSheetsStore;
use sqlite_adapter::SqliteHistoryProvider;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Live channel history through the Discord API
    Discord,
    /// A local Discord export database
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sink {
    /// Google Sheets, authenticated with a service account
    Sheets,
    /// One CSV file per destination range
    Csv,
}

/// CLI tool to extract trade records from Discord channels and write them to a spreadsheet
#[derive(Parser, Debug)]
#[command(name = "trade-sync")]
#[command(
    about = "Scans Discord channels for trade messages and exports them as spreadsheet tables"
)]
struct Cli {
    /// Where channel history is read from
    #[arg(long, value_enum, default_value_t = Source::Discord)]
    source: Source,

    /// Path to the source SQLite database file (sqlite source)
    #[arg(short = 'i', long = "input-db")]
    input_db: Option<String>,

    /// Where trade tables are written to
    #[arg(long, value_enum, default_value_t = Sink::Sheets)]
    sink: Sink,

    /// Folder for CSV tables (csv sink)
    #[arg(short = 'o', long = "output-dir", default_value = "exports")]
    output_dir: String,

    /// Read variables from this file instead of ./.env
    #[arg(long = "env-file")]
    env_file: Option<PathBuf>,
}

fn build_history(
    cli: &Cli,
    config: &Config,
) -> Result<Box<dyn ChatHistoryProvider>, anyhow::Error> {
    let history: Box<dyn ChatHistoryProvider> = match cli.source {
        Source::Discord => {
            let token = config
                .discord_token
                .clone()
                .context("DISCORD_TOKEN is required for the discord source")?;
            Box::new(DiscordHistoryProvider::new(token)?)
        }
        Source::Sqlite => {
            let db_path = cli
                .input_db
                .clone()
                .context("--input-db is required for the sqlite source")?;
            Box::new(SqliteHistoryProvider::new(db_path))
        }
    };
    Ok(history)
}

fn build_store(cli: &Cli, config: &Config) -> Result<Box<dyn TabularStore>, anyhow::Error> {
    let store: Box<dyn TabularStore> = match cli.sink {
        Sink::Sheets => {
            let spreadsheet_id = config
                .spreadsheet_id
                .clone()
                .context("SPREADSHEET_ID is required for the sheets sink")?;
            let key_file = config
                .service_account_file
                .as_deref()
                .context("SERVICE_ACCOUNT_FILE is required for the sheets sink")?;
            Box::new(GoogleSheetsStore::from_service_account_file(key_file, spreadsheet_id)?)
        }
        Sink::Csv => Box::new(CsvTableStore::new(cli.output_dir.clone())),
    };
    Ok(store)
}

fn load_env(cli: &Cli) -> Result<(), anyhow::Error> {
    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("Cannot read env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<RunSummary, anyhow::Error> {
    load_env(&cli)?;
    let config = Config::from_env()?;

    // Instantiate concrete implementations of secondary adapters
    let history = build_history(&cli, &config)?;
    let exporter = TabularExporter::new(build_store(&cli, &config)?);

    let settings = SyncSettings {
        targets: config.targets.clone(),
        history_limit: config.history_limit,
    };

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current channel");
            flag.store(true, Ordering::SeqCst);
        }
    });

    // Instantiate the core business service with dependency injection
    let extractor = TradeExtractor::new(config.reference_tz);
    let service = SyncServiceImpl::new(history, exporter, extractor, settings).with_stop_flag(stop);

    Ok(service.execute_sync().await)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(summary) => {
            for report in &summary.channels {
                tracing::info!(
                    "{}: {} messages, {} candidates, {} trades, {} skipped, exported: {}{}",
                    report.key,
                    report.fetched,
                    report.candidates,
                    report.trades,
                    report.skipped,
                    report.exported,
                    report.error.as_ref().map(|e| format!(" ({})", e)).unwrap_or_default()
                );
            }
            tracing::info!(
                "Done: {} trades, {} of {} channels exported",
                summary.total_trades(),
                summary.exported_channels(),
                summary.channels.len()
            );
        }
        Err(e) => {
            tracing::error!("Error during sync: {:#}", e);
            std::process::exit(1);
        }
    }
}
