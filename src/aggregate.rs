//! Pure merge of worker outputs into the final row set and run summary.

use crate::models::VoteRow;
use crate::scheduler::{WorkerOutput, WorkerStats};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Data-quality report of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub workers: usize,
    pub rows_accepted: usize,
    /// Rows dropped because title, vote date or resolution label was absent.
    pub rows_incomplete: usize,
    #[serde(flatten)]
    pub stats: WorkerStats,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            workers = self.workers,
            rows_accepted = self.rows_accepted,
            rows_incomplete = self.rows_incomplete,
            normalization_rejects = self.stats.normalization_rejects,
            format_rejects = self.stats.format_rejects,
            sentinel_skipped = self.stats.sentinel_skipped,
            pages_failed = self.stats.pages_failed,
            resolutions_failed = self.stats.resolutions_failed,
            lines_examined = self.stats.lines_examined,
            "Harvest summary"
        );
        if self.stats.positional_fallbacks > 0 {
            warn!(
                resolutions = self.stats.positional_fallbacks,
                "Vote block located by position on some pages"
            );
        }
    }
}

/// Final rows plus their summary.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    pub rows: Vec<VoteRow>,
    pub summary: RunSummary,
}

/// Flatten every worker's rows, dropping incomplete ones.
///
/// Row order follows the order of `outputs` and carries no other meaning.
pub fn merge(outputs: Vec<WorkerOutput>) -> Harvest {
    let mut summary = RunSummary {
        workers: outputs.len(),
        ..RunSummary::default()
    };
    let mut rows = Vec::new();

    for output in outputs {
        debug!(
            partition = output.partition.index,
            years = ?output.partition.years,
            rows = output.rows.len(),
            elapsed_ms = output.elapsed.as_millis() as u64,
            "Merging worker output"
        );
        summary.stats.merge(&output.stats);
        for row in output.rows {
            if row.is_complete() {
                rows.push(row);
            } else {
                summary.rows_incomplete += 1;
            }
        }
    }
    summary.rows_accepted = rows.len();
    Harvest { rows, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VoteOutcome, YearPartition};
    use std::time::Duration;

    fn row(country: &str, title: Option<&str>) -> VoteRow {
        VoteRow {
            country: country.to_string(),
            vote_result: VoteOutcome::Yes,
            title: title.map(str::to_string),
            vote_date: Some("1995".to_string()),
            resolution: Some("A/RES/50/1".to_string()),
        }
    }

    fn output(index: usize, rows: Vec<VoteRow>, lines: usize) -> WorkerOutput {
        WorkerOutput {
            partition: YearPartition {
                index,
                years: 1995..1996,
            },
            stats: WorkerStats {
                lines_examined: lines,
                rows_emitted: rows.len(),
                ..WorkerStats::default()
            },
            rows,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_merge_drops_incomplete_rows() {
        let harvest = merge(vec![
            output(0, vec![row("France", Some("Cooperation")), row("Chad", None)], 4),
            output(1, vec![row("Japan", Some("Cooperation"))], 3),
        ]);

        assert_eq!(harvest.rows.len(), 2);
        assert!(harvest.rows.iter().all(VoteRow::is_complete));
        assert_eq!(harvest.summary.workers, 2);
        assert_eq!(harvest.summary.rows_accepted, 2);
        assert_eq!(harvest.summary.rows_incomplete, 1);
        assert_eq!(harvest.summary.stats.lines_examined, 7);
        assert_eq!(harvest.summary.stats.rows_emitted, 3);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let harvest = merge(Vec::new());
        assert!(harvest.rows.is_empty());
        assert_eq!(harvest.summary, RunSummary::default());
    }

    #[test]
    fn test_summary_serializes_flat() {
        let harvest = merge(vec![output(0, vec![row("France", Some("t"))], 1)]);
        let json = serde_json::to_value(&harvest.summary).unwrap();
        assert_eq!(json["rows_accepted"], 1);
        assert_eq!(json["lines_examined"], 1);
        assert!(json.get("stats").is_none());
    }
}
