//! Command-line interface definitions for un_votes.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Flags override the YAML config file, which overrides the built-in defaults.

use crate::config::{FileConfig, HarvestConfig, HttpConfig, VetoConfig};
use crate::scheduler::RemainderPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the un_votes application.
///
/// # Examples
///
/// ```sh
/// # Every General Assembly vote since 1991 into ./UNResult.csv
/// un_votes votes
///
/// # A narrower window, more workers, and a summary for auditing
/// un_votes votes --start-year 2000 --end-year 2010 --partitions 11 --summary-json summary.json
///
/// # Security Council vetoes
/// un_votes veto -o data/UNResultVeto.csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Retries per request after the first attempt
    #[arg(long, global = true)]
    pub max_retries: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest per-country General Assembly votes
    Votes(VotesArgs),
    /// Scrape the Security Council veto list
    Veto(VetoArgs),
}

#[derive(Args, Debug, Default)]
pub struct VotesArgs {
    /// First year to harvest
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Last year to harvest (inclusive)
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Records per listing request
    #[arg(long)]
    pub page_step: Option<u32>,

    /// Number of year partitions (one worker each)
    #[arg(short, long)]
    pub partitions: Option<usize>,

    /// Workers running at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// How to treat years left over after partitioning
    #[arg(long, value_enum)]
    pub remainder: Option<RemainderPolicy>,

    /// Skip resolutions whose vote date falls in this year
    #[arg(long)]
    pub sentinel_year: Option<i32>,

    /// Disable the sentinel-year filter
    #[arg(long, conflicts_with = "sentinel_year")]
    pub no_sentinel: bool,

    /// Output CSV path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the run summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Digital Library base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

impl VotesArgs {
    /// Override `config` with every flag that was given.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(v) = self.start_year {
            config.start_year = v;
        }
        if let Some(v) = self.end_year {
            config.end_year = v;
        }
        if let Some(v) = self.page_step {
            config.page_step = v;
        }
        if let Some(v) = self.partitions {
            config.partitions = v;
        }
        if let Some(v) = self.concurrency {
            config.concurrency = v;
        }
        if let Some(v) = self.remainder {
            config.remainder = v;
        }
        if let Some(v) = self.sentinel_year {
            config.sentinel_year = Some(v);
        }
        if self.no_sentinel {
            config.sentinel_year = None;
        }
        if let Some(v) = &self.output {
            config.output = v.clone();
        }
        if let Some(v) = &self.summary_json {
            config.summary_json = Some(v.clone());
        }
        if let Some(v) = &self.base_url {
            config.base_url = v.clone();
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct VetoArgs {
    /// Keep vetoes cast after this year
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Output CSV path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Veto table URL
    #[arg(long)]
    pub url: Option<String>,
}

impl VetoArgs {
    pub fn apply(&self, config: &mut VetoConfig) {
        if let Some(v) = self.start_year {
            config.start_year = v;
        }
        if let Some(v) = &self.output {
            config.output = v.clone();
        }
        if let Some(v) = &self.url {
            config.url = v.clone();
        }
    }
}

impl Cli {
    /// Apply the global transport flags.
    pub fn apply_http(&self, config: &mut HttpConfig) {
        if let Some(v) = self.max_retries {
            config.max_retries = v;
        }
        if let Some(v) = self.timeout_secs {
            config.request_timeout_secs = v;
        }
    }

    /// Layer every flag over a loaded config file.
    pub fn apply(&self, config: &mut FileConfig) {
        self.apply_http(&mut config.http);
        match &self.command {
            Command::Votes(args) => args.apply(&mut config.votes),
            Command::Veto(args) => args.apply(&mut config.veto),
        }
    }
}
