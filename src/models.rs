//! Data models for resolutions, votes and the rows written to disk.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Resolution`]: Metadata scraped from one resolution's detail page
//! - [`VoteOutcome`] / [`VoteRecord`]: One country's vote on one resolution
//! - [`Country`]: A raw country name resolved against the ISO registry
//! - [`YearPartition`]: The slice of years handed to one worker
//! - [`VoteRow`] / [`VetoRow`]: Flat rows serialized to CSV
//!
//! The row types rename their fields to the spaced column headers of the
//! published dataset (`vote result`, `vote date`), hence the `serde(rename)`
//! attributes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Metadata of a single voted resolution.
///
/// Built once when the detail page is parsed and never mutated afterwards.
/// Every field except the identifier may be absent when the page lacks the
/// corresponding label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The detail-page link as found on the listing page (e.g. `/record/280171?ln=en`).
    pub id: String,
    /// The resolution title.
    pub title: Option<String>,
    /// The resolution label, e.g. `A/RES/46/242`.
    pub label: Option<String>,
    /// The vote date as printed on the page, usually `YYYY-MM-DD`.
    pub vote_date: Option<String>,
}

impl Resolution {
    /// The four-character year prefix of the vote date.
    ///
    /// Downstream consumers only use year granularity, so this is what ends
    /// up in the `vote date` column.
    pub fn vote_year(&self) -> Option<&str> {
        self.vote_date.as_deref().and_then(|d| d.get(..4))
    }
}

/// A country's recorded position on a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteOutcome {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
    #[serde(rename = "A")]
    Abstain,
    #[serde(rename = "NV")]
    NotVoting,
}

impl VoteOutcome {
    /// Map a single-character vote code to an outcome.
    ///
    /// Only `Y`, `N` and `A` appear on detail pages; `NotVoting` is implied by
    /// the absence of a code and therefore never parsed.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Y" => Some(VoteOutcome::Yes),
            "N" => Some(VoteOutcome::No),
            "A" => Some(VoteOutcome::Abstain),
            _ => None,
        }
    }

    /// The code written to the `vote result` column.
    pub fn code(&self) -> &'static str {
        match self {
            VoteOutcome::Yes => "Y",
            VoteOutcome::No => "N",
            VoteOutcome::Abstain => "A",
            VoteOutcome::NotVoting => "NV",
        }
    }
}

impl fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A country name that resolved against the ISO 3166 registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    /// The text as it appeared on the page, e.g. `IRAN (ISLAMIC REPUBLIC OF)`.
    pub raw: String,
    /// The canonical name after recasing and alias rewriting, e.g. `Iran`.
    pub name: String,
    /// ISO 3166-1 alpha-2 code, e.g. `IR`.
    pub alpha2: &'static str,
}

/// One country's vote on one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    /// Identifier of the [`Resolution`] this vote belongs to.
    pub resolution_id: String,
    pub country: Country,
    pub outcome: VoteOutcome,
}

/// A contiguous half-open range of years assigned to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearPartition {
    /// Position of this partition in the schedule, used for logging.
    pub index: usize,
    pub years: Range<i32>,
}

impl YearPartition {
    pub fn year_count(&self) -> usize {
        self.years.len()
    }
}

/// A flat output row of the acquisition pipeline.
///
/// `title`, `vote_date` and `resolution` stay optional until aggregation,
/// where rows with any absent field are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRow {
    pub country: String,
    #[serde(rename = "vote result")]
    pub vote_result: VoteOutcome,
    pub title: Option<String>,
    #[serde(rename = "vote date")]
    pub vote_date: Option<String>,
    pub resolution: Option<String>,
}

impl VoteRow {
    /// Join a vote with the metadata of its resolution.
    pub fn new(resolution: &Resolution, record: &VoteRecord) -> Self {
        VoteRow {
            country: record.country.name.clone(),
            vote_result: record.outcome,
            title: resolution.title.clone(),
            vote_date: resolution.vote_year().map(str::to_string),
            resolution: resolution.label.clone(),
        }
    }

    /// Whether every column carries a value.
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.vote_date.is_some() && self.resolution.is_some()
    }
}

/// A row of the Security Council veto dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoRow {
    #[serde(rename = "vote date")]
    pub vote_date: String,
    pub resolution: String,
    pub topic: String,
    pub country: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution() -> Resolution {
        Resolution {
            id: "/record/280171?ln=en".to_string(),
            title: Some("Situation of human rights in Iraq".to_string()),
            label: Some("A/RES/46/134".to_string()),
            vote_date: Some("1991-12-17".to_string()),
        }
    }

    fn record(outcome: VoteOutcome) -> VoteRecord {
        VoteRecord {
            resolution_id: "/record/280171?ln=en".to_string(),
            country: Country {
                raw: "UNITED STATES".to_string(),
                name: "United States".to_string(),
                alpha2: "US",
            },
            outcome,
        }
    }

    #[test]
    fn test_vote_year_prefix() {
        assert_eq!(resolution().vote_year(), Some("1991"));

        let undated = Resolution {
            vote_date: None,
            ..resolution()
        };
        assert_eq!(undated.vote_year(), None);

        let short = Resolution {
            vote_date: Some("19".to_string()),
            ..resolution()
        };
        assert_eq!(short.vote_year(), None);
    }

    #[test]
    fn test_vote_outcome_codes() {
        assert_eq!(VoteOutcome::from_code("Y"), Some(VoteOutcome::Yes));
        assert_eq!(VoteOutcome::from_code("N"), Some(VoteOutcome::No));
        assert_eq!(VoteOutcome::from_code("A"), Some(VoteOutcome::Abstain));
        assert_eq!(VoteOutcome::from_code("X"), None);
        assert_eq!(VoteOutcome::from_code("NV"), None);
        assert_eq!(VoteOutcome::NotVoting.to_string(), "NV");
    }

    #[test]
    fn test_vote_outcome_serializes_as_code() {
        let json = serde_json::to_string(&VoteOutcome::Abstain).unwrap();
        assert_eq!(json, "\"A\"");
    }

    #[test]
    fn test_vote_row_joins_resolution() {
        let row = VoteRow::new(&resolution(), &record(VoteOutcome::Yes));
        assert_eq!(row.country, "United States");
        assert_eq!(row.vote_result, VoteOutcome::Yes);
        assert_eq!(row.vote_date.as_deref(), Some("1991"));
        assert_eq!(row.resolution.as_deref(), Some("A/RES/46/134"));
        assert!(row.is_complete());
    }

    #[test]
    fn test_vote_row_incomplete_without_title() {
        let untitled = Resolution {
            title: None,
            ..resolution()
        };
        let row = VoteRow::new(&untitled, &record(VoteOutcome::No));
        assert!(!row.is_complete());
    }

    #[test]
    fn test_year_partition_year_count() {
        let p = YearPartition {
            index: 0,
            years: 1991..1995,
        };
        assert_eq!(p.year_count(), 4);
    }
}
