//! # un_votes
//!
//! Harvests per-country United Nations General Assembly voting records from
//! the UN Digital Library into a flat CSV, plus a companion table of
//! Security Council vetoes.
//!
//! ## Usage
//!
//! ```sh
//! un_votes votes --start-year 1991 --partitions 8 -o UNResult.csv
//! un_votes veto -o UNResultVeto.csv
//! ```
//!
//! ## Architecture
//!
//! The `votes` pipeline:
//! 1. **Partitioning**: Split the year range into contiguous chunks, one worker each
//! 2. **Indexing**: Each worker enumerates the listing pages of its years
//! 3. **Fetching**: Each listed resolution's detail page is parsed into votes,
//!    with country names normalized against ISO 3166
//! 4. **Output**: Worker results are merged, incomplete rows dropped, and the
//!    rows written as CSV

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod aggregate;
mod cli;
mod config;
mod country;
mod error;
mod http;
mod models;
mod outputs;
mod registry;
mod scheduler;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::{HarvestConfig, VetoConfig};
use http::Fetch;
use outputs::json;
use utils::ensure_parent_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("un_votes starting up");

    // Parse CLI, then layer it over the config file
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    let mut config = config::load(args.config.as_deref()).await?;
    args.apply(&mut config);

    let fetcher = http::build_fetcher(&config.http)?;
    info!(
        max_retries = config.http.max_retries,
        timeout_secs = config.http.request_timeout_secs,
        "HTTP client ready"
    );

    let result = match &args.command {
        Command::Votes(_) => harvest_votes(&fetcher, &config.votes).await,
        Command::Veto(_) => harvest_vetoes(&fetcher, &config.veto).await,
    };
    if let Err(e) = &result {
        error!(error = %e, "Run failed");
    }
    result?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn harvest_votes<F: Fetch>(fetcher: &F, config: &HarvestConfig) -> Result<(), error::HarvestError> {
    config.validate()?;
    info!(
        years = ?config.years(),
        partitions = config.partitions,
        concurrency = config.concurrency,
        page_step = config.page_step,
        sentinel_year = ?config.sentinel_year,
        "Harvest configured"
    );

    // Early checks: unwritable sink or unreachable library fail before any work
    ensure_parent_dir(&config.output).await?;
    scheduler::preflight(fetcher, &config.base_url()?).await?;

    let worker_outputs = scheduler::run(fetcher, config).await?;
    let harvest = aggregate::merge(worker_outputs);

    outputs::csv::write_rows(&harvest.rows, &config.output).await?;
    harvest.summary.log();
    if let Some(path) = &config.summary_json {
        json::write_summary(&harvest.summary, path).await?;
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn harvest_vetoes<F: Fetch>(fetcher: &F, config: &VetoConfig) -> Result<(), error::HarvestError> {
    ensure_parent_dir(&config.output).await?;
    let harvest = scrapers::veto::harvest(fetcher, config).await?;
    outputs::csv::write_rows(&harvest.rows, &config.output).await?;
    info!(
        rows = harvest.rows.len(),
        rejected = harvest.rejected,
        path = %config.output.display(),
        "Veto table written"
    );
    Ok(())
}
