//! Run configuration: built-in defaults, an optional YAML file, CLI overrides.
//!
//! ```yaml
//! votes:
//!   start_year: 1991
//!   end_year: 2023
//!   partitions: 8
//!   concurrency: 4
//!   sentinel_year: null   # disable the placeholder-year filter
//! veto:
//!   start_year: 1991
//! http:
//!   max_retries: 5
//! ```
//!
//! Every field is optional. CLI flags are applied on top by
//! [`VotesArgs::apply`](crate::cli::VotesArgs::apply) and friends.

use crate::error::HarvestError;
use crate::scheduler::RemainderPolicy;
use crate::scrapers::detail::DEFAULT_VOTE_LABEL;
use crate::scrapers::listing::DEFAULT_PAGE_STEP;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://digitallibrary.un.org";
pub const DEFAULT_COLLECTION: &str = "Voting Data";
pub const DEFAULT_START_YEAR: i32 = 1991;
pub const DEFAULT_SENTINEL_YEAR: i32 = 1981;
pub const DEFAULT_VETO_URL: &str = "https://www.un.org/Depts/dhl/resguide/scact_veto_table_en.htm";

/// Options of the voting-record harvest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub base_url: String,
    pub collection: String,
    /// Records per listing request.
    pub page_step: u32,
    pub start_year: i32,
    /// Inclusive.
    pub end_year: i32,
    pub partitions: usize,
    /// Workers running at once.
    pub concurrency: usize,
    pub remainder: RemainderPolicy,
    /// Resolutions dated in this year are skipped. `None` disables the filter.
    pub sentinel_year: Option<i32>,
    pub vote_label: String,
    pub output: PathBuf,
    pub summary_json: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            page_step: DEFAULT_PAGE_STEP,
            start_year: DEFAULT_START_YEAR,
            end_year: Utc::now().year(),
            partitions: 8,
            concurrency: 4,
            remainder: RemainderPolicy::default(),
            sentinel_year: Some(DEFAULT_SENTINEL_YEAR),
            vote_label: DEFAULT_VOTE_LABEL.to_string(),
            output: PathBuf::from("UNResult.csv"),
            summary_json: None,
        }
    }
}

impl HarvestConfig {
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    /// The base URL with a trailing slash, so relative joins keep its path.
    pub fn base_url(&self) -> Result<Url, HarvestError> {
        let mut raw = self.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| HarvestError::Config(format!("base_url {:?}: {e}", self.base_url)))
    }

    /// Reject option combinations the scheduler cannot run.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.start_year > self.end_year {
            return Err(HarvestError::Config(format!(
                "empty year range {}..={}",
                self.start_year, self.end_year
            )));
        }
        if self.page_step == 0 {
            return Err(HarvestError::Config("page_step must be at least 1".into()));
        }
        if self.partitions == 0 {
            return Err(HarvestError::Config("partitions must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(HarvestError::Config("concurrency must be at least 1".into()));
        }
        if self.vote_label.trim().is_empty() {
            return Err(HarvestError::Config("vote_label must not be empty".into()));
        }
        self.base_url().map(|_| ())
    }
}

/// Options of the Security Council veto scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VetoConfig {
    pub url: String,
    /// Rows dated in or before this year are not scraped.
    pub start_year: i32,
    pub output: PathBuf,
}

impl Default for VetoConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_VETO_URL.to_string(),
            start_year: DEFAULT_START_YEAR,
            output: PathBuf::from("UNResultVeto.csv"),
        }
    }
}

/// Transport options shared by both scrapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

/// Top-level layout of the YAML config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub votes: HarvestConfig,
    pub veto: VetoConfig,
    pub http: HttpConfig,
}

/// Load the config file at `path`, or the built-in defaults when there is none.
#[instrument(level = "info")]
pub async fn load(path: Option<&Path>) -> Result<FileConfig, HarvestError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| HarvestError::io(path.display().to_string(), e))?;
    let config: FileConfig = serde_yaml::from_str(&text)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.page_step, 50);
        assert_eq!(config.start_year, 1991);
        assert!(config.end_year >= 2024);
        assert_eq!(config.sentinel_year, Some(1981));
        assert_eq!(config.remainder, RemainderPolicy::Absorb);
        assert_eq!(config.output, PathBuf::from("UNResult.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let config = HarvestConfig {
            base_url: "http://127.0.0.1:8080/mirror".to_string(),
            ..HarvestConfig::default()
        };
        let base = config.base_url().unwrap();
        assert_eq!(base.join("search").unwrap().as_str(), "http://127.0.0.1:8080/mirror/search");
    }

    #[test]
    fn test_validate_rejects_bad_options() {
        let bad = [
            HarvestConfig {
                start_year: 2000,
                end_year: 1999,
                ..HarvestConfig::default()
            },
            HarvestConfig {
                page_step: 0,
                ..HarvestConfig::default()
            },
            HarvestConfig {
                partitions: 0,
                ..HarvestConfig::default()
            },
            HarvestConfig {
                concurrency: 0,
                ..HarvestConfig::default()
            },
            HarvestConfig {
                base_url: "not a url".to_string(),
                ..HarvestConfig::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(HarvestError::Config(_))),
                "accepted {config:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_load_without_path_uses_defaults() {
        let config = load(None).await.unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[tokio::test]
    async fn test_load_partial_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("un_votes.yaml");
        std::fs::write(
            &path,
            "votes:\n  start_year: 2001\n  end_year: 2003\n  sentinel_year: null\n  remainder: drop\nhttp:\n  max_retries: 1\n",
        )
        .unwrap();

        let config = load(Some(&path)).await.unwrap();
        assert_eq!(config.votes.years(), 2001..=2003);
        assert_eq!(config.votes.sentinel_year, None);
        assert_eq!(config.votes.remainder, RemainderPolicy::Drop);
        assert_eq!(config.votes.partitions, 8);
        assert_eq!(config.http.max_retries, 1);
        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.veto, VetoConfig::default());
    }

    #[tokio::test]
    async fn test_load_reports_missing_file() {
        let err = load(Some(Path::new("/nonexistent/un_votes.yaml"))).await.unwrap_err();
        assert!(matches!(err, HarvestError::Io { .. }));
    }
}
