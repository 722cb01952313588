//! Year partitioning and the worker pool.
//!
//! The configured year range is cut into contiguous [`YearPartition`]s. Each
//! partition gets one worker that walks its years sequentially:
//! listing pages first, then every resolution on them. Workers share nothing
//! mutable; each one returns its rows and [`WorkerStats`] by value and the
//! caller merges them (see [`crate::aggregate`]).
//!
//! Workers are plain futures driven by `buffer_unordered`, so the number of
//! workers in flight (`concurrency`) is independent of the partition count.

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::http::Fetch;
use crate::models::{VoteRow, YearPartition};
use crate::scrapers::detail::{LineTally, RecordFetcher, SentinelFilter};
use crate::scrapers::listing::PageEnumerator;
use clap::ValueEnum;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::pin::pin;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// What to do with the years left over when the range does not divide evenly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Spread leftover years over the first partitions.
    #[default]
    Absorb,
    /// Leave leftover years unharvested.
    Drop,
}

/// Cut `years` into `partitions` contiguous chunks.
///
/// More partitions than years are clamped to one year each.
pub fn partition_years(
    years: RangeInclusive<i32>,
    partitions: usize,
    policy: RemainderPolicy,
) -> Result<Vec<YearPartition>, HarvestError> {
    let (start, end) = (*years.start(), *years.end());
    if start > end {
        return Err(HarvestError::Config(format!("empty year range {start}..={end}")));
    }
    if partitions == 0 {
        return Err(HarvestError::Config("partitions must be at least 1".into()));
    }

    let span = (end - start + 1) as usize;
    let count = partitions.min(span);
    let (size, remainder) = (span / count, span % count);

    let mut next = start;
    let chunks: Vec<YearPartition> = (0..count)
        .map(|index| {
            let extra = match policy {
                RemainderPolicy::Absorb => usize::from(index < remainder),
                RemainderPolicy::Drop => 0,
            };
            let len = (size + extra) as i32;
            let partition = YearPartition {
                index,
                years: next..next + len,
            };
            next += len;
            partition
        })
        .collect();

    if next <= end {
        warn!(
            first = next,
            last = end,
            "Remainder policy drops trailing years"
        );
    }
    Ok(chunks)
}

/// Counters kept by one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub resolutions_fetched: usize,
    pub resolutions_failed: usize,
    /// Identifiers listed more than once in the same year.
    pub duplicate_ids: usize,
    pub lines_examined: usize,
    pub rows_emitted: usize,
    pub normalization_rejects: usize,
    pub format_rejects: usize,
    pub fields_missing: usize,
    pub sentinel_skipped: usize,
    pub positional_fallbacks: usize,
}

impl WorkerStats {
    /// Add the outcome of one parsed resolution.
    pub fn absorb(&mut self, tally: &LineTally) {
        self.lines_examined += tally.lines_examined;
        self.format_rejects += tally.format_rejects;
        self.normalization_rejects += tally.normalization_rejects;
        self.fields_missing += tally.fields_missing;
        self.sentinel_skipped += usize::from(tally.sentinel_skipped);
        self.positional_fallbacks += usize::from(tally.positional_fallback);
    }

    pub fn merge(&mut self, other: &WorkerStats) {
        self.pages_fetched += other.pages_fetched;
        self.pages_failed += other.pages_failed;
        self.resolutions_fetched += other.resolutions_fetched;
        self.resolutions_failed += other.resolutions_failed;
        self.duplicate_ids += other.duplicate_ids;
        self.lines_examined += other.lines_examined;
        self.rows_emitted += other.rows_emitted;
        self.normalization_rejects += other.normalization_rejects;
        self.format_rejects += other.format_rejects;
        self.fields_missing += other.fields_missing;
        self.sentinel_skipped += other.sentinel_skipped;
        self.positional_fallbacks += other.positional_fallbacks;
    }
}

/// Everything one worker produced.
#[derive(Debug, Clone)]
pub struct WorkerOutput {
    pub partition: YearPartition,
    pub rows: Vec<VoteRow>,
    pub stats: WorkerStats,
    pub elapsed: Duration,
}

/// Check that the base URL answers before any worker starts.
#[instrument(level = "info", skip_all, fields(base = %base))]
pub async fn preflight<F: Fetch>(fetcher: &F, base: &Url) -> Result<(), HarvestError> {
    match fetcher.get(base.as_str()).await {
        Ok(_) => {
            info!("Base URL reachable");
            Ok(())
        }
        Err(e) => Err(HarvestError::Config(format!("base URL {base} unreachable: {e}"))),
    }
}

/// Harvest every configured year and return one output per partition.
///
/// Output order follows worker completion, not year order.
#[instrument(level = "info", skip_all, fields(years = ?config.years(), partitions = config.partitions, concurrency = config.concurrency))]
pub async fn run<F: Fetch>(fetcher: &F, config: &HarvestConfig) -> Result<Vec<WorkerOutput>, HarvestError> {
    let partitions = partition_years(config.years(), config.partitions, config.remainder)?;
    let base = config.base_url()?;
    let sentinel = SentinelFilter::new(config.sentinel_year);
    let enumerator = PageEnumerator::new(fetcher, base.clone(), &config.collection, config.page_step);
    let records = RecordFetcher::new(fetcher, base, sentinel).with_vote_label(&config.vote_label);

    info!(
        workers = partitions.len(),
        sentinel_year = ?sentinel.year(),
        "Starting workers"
    );
    let outputs = stream::iter(partitions)
        .map(|partition| run_worker(&enumerator, &records, partition))
        .buffer_unordered(config.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;
    Ok(outputs)
}

#[instrument(level = "info", skip_all, fields(partition = partition.index, years = ?partition.years))]
async fn run_worker<F: Fetch>(
    enumerator: &PageEnumerator<'_, F>,
    records: &RecordFetcher<'_, F>,
    partition: YearPartition,
) -> WorkerOutput {
    let t0 = Instant::now();
    let mut rows = Vec::new();
    let mut stats = WorkerStats::default();

    for year in partition.years.clone() {
        let mut seen = HashSet::new();
        let mut pages = pin!(enumerator.enumerate(year));

        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    stats.pages_failed += 1;
                    error!(year, error = %e, "Listing request failed; skipping window");
                    continue;
                }
            };
            stats.pages_fetched += 1;
            debug!(year = page.year, offset = page.offset, ids = page.ids.len(), "Processing listing window");

            for id in page.ids {
                if !seen.insert(id.clone()) {
                    stats.duplicate_ids += 1;
                    debug!(year, %id, "Resolution already listed this year");
                    continue;
                }
                match records.fetch(&id).await {
                    Ok(fetched) => {
                        stats.resolutions_fetched += 1;
                        stats.absorb(&fetched.tally);
                        rows.extend(
                            fetched
                                .votes
                                .iter()
                                .map(|vote| VoteRow::new(&fetched.resolution, vote)),
                        );
                    }
                    Err(e) => {
                        stats.resolutions_failed += 1;
                        error!(year, %id, error = %e, "Resolution fetch failed; skipping");
                    }
                }
            }
        }
        info!(year, resolutions = seen.len(), rows = rows.len(), "Finished year");
    }

    stats.rows_emitted = rows.len();
    let elapsed = t0.elapsed();
    info!(
        years = partition.year_count(),
        rows = stats.rows_emitted,
        pages_failed = stats.pages_failed,
        resolutions_failed = stats.resolutions_failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "Worker finished"
    );
    WorkerOutput {
        partition,
        rows,
        stats,
        elapsed,
    }
}
