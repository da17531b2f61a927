//! # Larder Main Entry Point
//!
//! Loads configuration, wires the source and storage together, and drives one
//! harvesting run.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use larder::config::{ConfigLoader, PacingMode};
use larder::db::init_pool;
use larder::harvester::{FetchOptions, Harvester};
use larder::logging;
use larder::retry::RateLimitRetry;
use larder::source::{FreshMarketSource, GrocerySource, PacedSource};

/// Harvest a grocery catalog into local storage.
#[derive(Debug, Parser)]
#[command(name = "larder", version, about)]
struct Cli {
    /// Fetch details but skip storage writes
    #[arg(long)]
    dry_run: bool,

    /// Mark this invocation as a resume of earlier work
    #[arg(long)]
    resume: bool,

    /// Concurrent department listings (stage A)
    #[arg(long)]
    dept_concurrency: Option<usize>,

    /// Concurrent detail fetches (stage B)
    #[arg(long)]
    detail_concurrency: Option<usize>,

    /// Incremental window start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    since: Option<chrono::NaiveDate>,

    /// Serialize all outbound calls with fixed spacing
    #[arg(long)]
    serialized: bool,

    /// Store whose catalog to harvest
    #[arg(long)]
    store_id: Option<i64>,
}

fn parse_date(raw: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::new().load()?;
    logging::init_subscriber(&config);

    if let Ok(redacted) = config.redacted_json() {
        tracing::info!(profile = %config.profile, config = %redacted, "configuration loaded");
    }

    let db = Arc::new(init_pool(&config).await?);

    let retry = RateLimitRetry::new(config.retry.clone())?;
    let base: Arc<dyn GrocerySource> = Arc::new(FreshMarketSource::new(&config, retry)?);
    let serialized = cli.serialized || config.pacing.mode == PacingMode::Serialized;
    let source: Arc<dyn GrocerySource> = if serialized {
        Arc::new(PacedSource::new(
            base,
            Duration::from_millis(config.pacing.min_spacing_ms),
        ))
    } else {
        base
    };

    let store_id = cli.store_id.unwrap_or(config.store_id);
    let harvester = Harvester::new(Arc::clone(&db), source, store_id);

    let mut options = FetchOptions::from_config(&config);
    options.dry_run |= cli.dry_run;
    options.resume |= cli.resume;
    if let Some(n) = cli.dept_concurrency {
        options.dept_concurrency = n;
    }
    if let Some(n) = cli.detail_concurrency {
        options.detail_concurrency = n;
    }
    if cli.since.is_some() {
        options.since = cli.since;
    }

    let report = harvester.run(&options).await?;
    println!(
        "departments={} items={} details={} failed={} duration_ms={}",
        report.departments, report.items, report.details, report.failed, report.duration_ms
    );

    drop(harvester);
    if let Some(conn) = Arc::into_inner(db) {
        conn.close().await?;
    }
    Ok(())
}
