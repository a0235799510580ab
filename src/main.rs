mod batch;
mod config;
mod db;
mod error;
mod extractor;
mod matcher;
mod reconciler;
mod types;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::batch::{accuracy_report, ingest_predictions, lookback_dates, Batch};
use crate::config::Config;
use crate::db::{with_retry, PgStore, Store};
use crate::error::Result;
use crate::extractor::predictions::fetch_btts_predictions;
use crate::extractor::{build_extractor, PageClient};
use crate::matcher::{Matcher, NameMode};

/// Reconciles stored BTTS predictions with final scores scraped from the results site.
#[derive(Parser, Debug)]
#[command(name = "btts", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Fetch results and resolve pending predictions (default)
    Reconcile {
        /// Result dates to fetch (YYYY-MM-DD). Defaults to the lookback window.
        #[arg(long = "date", value_name = "YYYY-MM-DD")]
        dates: Vec<NaiveDate>,
    },
    /// Store upcoming BTTS tips from the trends page
    Ingest,
    /// List predictions still waiting for a result
    Pending,
    /// Report how many analysed predictions were correct
    Accuracy,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cli, cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, cfg: Config) -> Result<()> {
    let store = PgStore::connect(&cfg.db).await?;
    let outcome = match store.migrate().await {
        Ok(()) => execute(cli.command, &cfg, &store).await,
        Err(e) => Err(e),
    };
    // The pool is released on every path, errors included.
    store.close().await;
    outcome
}

async fn execute(command: Option<Command>, cfg: &Config, store: &PgStore) -> Result<()> {
    match command.unwrap_or(Command::Reconcile { dates: Vec::new() }) {
        Command::Reconcile { dates } => reconcile(cfg, store, dates).await,
        Command::Ingest => ingest(cfg, store).await,
        Command::Pending => pending(cfg, store).await,
        Command::Accuracy => accuracy(cfg, store).await,
    }
}

async fn reconcile(cfg: &Config, store: &PgStore, dates: Vec<NaiveDate>) -> Result<()> {
    let dates = if dates.is_empty() {
        lookback_dates(Utc::now().date_naive(), cfg.lookback_days)
    } else {
        dates
    };
    info!(
        extractor = %cfg.extractor,
        strict_names = cfg.strict_names,
        "Reconciling results for {} dates: {:?}",
        dates.len(),
        dates
    );

    let client = PageClient::new(cfg.http_timeout)?;
    let extractor = build_extractor(cfg.extractor, client, &cfg.base_url)?;
    let matcher = Matcher::new(NameMode::from_strict(cfg.strict_names));

    let summary = Batch::new(store, extractor.as_ref(), matcher, cfg.retry)
        .run(&dates, Utc::now())
        .await?;
    summary.log();
    Ok(())
}

async fn ingest(cfg: &Config, store: &PgStore) -> Result<()> {
    let client = PageClient::new(cfg.http_timeout)?;
    let page = fetch_btts_predictions(&client, &cfg.base_url).await?;
    let summary = ingest_predictions(store, &page.predictions, cfg.retry).await;
    info!(
        event = "INGEST_DONE",
        "Ingest complete | added: {} | existing: {} | skipped: {} | failed: {}",
        summary.added,
        summary.existing,
        page.skipped,
        summary.failed,
    );
    Ok(())
}

async fn pending(cfg: &Config, store: &PgStore) -> Result<()> {
    let now = Utc::now();
    let predictions = with_retry(cfg.retry, "pending_predictions", || {
        store.pending_predictions(now)
    })
    .await?;
    for p in &predictions {
        info!(
            "[PENDING] #{} {} ({} = {})",
            p.id,
            p.identity(),
            p.prediction_type,
            p.prediction_value
        );
    }
    info!("{} predictions pending", predictions.len());
    Ok(())
}

async fn accuracy(cfg: &Config, store: &PgStore) -> Result<()> {
    let stats = accuracy_report(store, cfg.retry).await?;
    match stats.hit_rate() {
        Some(rate) => info!(
            "Accuracy: {}/{} predictions correct ({:.1}%)",
            stats.correct,
            stats.analyzed,
            rate * 100.0
        ),
        None => info!("Accuracy: no predictions analysed yet"),
    }
    Ok(())
}
