//! Resolution detail-page scraper.
//!
//! A detail page is a list of `div.metadata-row` blocks, each pairing a label
//! span with one or more value spans. Metadata fields (`Title`,
//! `Resolution`, `Vote date`) are looked up by label, so block order does
//! not matter. The per-country votes live in the block labelled `Vote` as
//! `<br>`-separated lines:
//!
//! ```text
//! Y ALGERIA<br>N ISRAEL<br>A JAPAN<br>VANUATU<br>
//! ```
//!
//! A leading one-letter code is the vote; a line without one is a country
//! that did not vote.

use crate::country::CountryNormalizer;
use crate::error::HarvestError;
use crate::http::Fetch;
use crate::models::{Resolution, VoteOutcome, VoteRecord};
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

pub const TITLE_LABEL: &str = "Title";
pub const RESOLUTION_LABEL: &str = "Resolution";
pub const VOTE_DATE_LABEL: &str = "Vote date";
pub const DEFAULT_VOTE_LABEL: &str = "Vote";

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.metadata-row").unwrap());
static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());
static VALUE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.value").unwrap());

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn row_label(row: &ElementRef<'_>) -> Option<String> {
    row.select(&SPAN_SELECTOR).next().map(element_text)
}

/// Text of the value paired with `label`, wherever its block sits.
pub fn find_field(rows: &[ElementRef<'_>], label: &str) -> Option<String> {
    rows.iter().find_map(|row| {
        let mut spans = row.select(&SPAN_SELECTOR);
        if element_text(spans.next()?) != label {
            return None;
        }
        spans.next().map(element_text)
    })
}

/// Split a vote block into its `<br>`-separated lines.
///
/// Text of inline child elements is folded into the current line.
pub fn vote_lines(block: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for child in block.children() {
        match child.value() {
            Node::Text(text) => current.push_str(text),
            Node::Element(el) if el.name() == "br" => lines.push(std::mem::take(&mut current)),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    current.extend(el.text());
                }
            }
            _ => {}
        }
    }
    lines.push(current);
    lines
}

fn field_missing(label: &str, id: &str) -> HarvestError {
    HarvestError::FieldMissing {
        label: label.to_string(),
        context: id.to_string(),
    }
}

/// A tokenized vote line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteLine<'a> {
    pub outcome: VoteOutcome,
    /// The raw, still upper-case country tokens.
    pub country_tokens: Vec<&'a str>,
}

/// Tokenize one vote line.
///
/// # Errors
///
/// [`HarvestError::Format`] when the line has no tokens, starts with an
/// unknown one-letter code, or carries a code but no country.
pub fn parse_vote_line(line: &str) -> Result<VoteLine<'_>, HarvestError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let format_error = |reason| HarvestError::Format {
        line: truncate_for_log(line, 120),
        reason,
    };

    let Some(first) = tokens.first() else {
        return Err(format_error("no tokens"));
    };
    if first.chars().count() != 1 {
        return Ok(VoteLine {
            outcome: VoteOutcome::NotVoting,
            country_tokens: tokens,
        });
    }

    let outcome = VoteOutcome::from_code(first).ok_or_else(|| format_error("unknown vote code"))?;
    if tokens.len() == 1 {
        return Err(format_error("vote code without country"));
    }
    Ok(VoteLine {
        outcome,
        country_tokens: tokens[1..].to_vec(),
    })
}

/// Excludes resolutions dated in one configured year.
///
/// The archive carries resolutions stamped with a placeholder year; the
/// filter drops every vote of a resolution whose date begins with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SentinelFilter {
    year: Option<i32>,
}

impl SentinelFilter {
    pub fn new(year: Option<i32>) -> Self {
        Self { year }
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn excludes(&self, vote_date: &str) -> bool {
        self.year
            .is_some_and(|year| vote_date.starts_with(&year.to_string()))
    }
}

/// What happened to the lines of one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineTally {
    /// Non-blank vote lines looked at.
    pub lines_examined: usize,
    pub format_rejects: usize,
    pub normalization_rejects: usize,
    /// Expected labels that were absent.
    pub fields_missing: usize,
    pub sentinel_skipped: bool,
    /// The vote block was found by position instead of by label.
    pub positional_fallback: bool,
}

/// A parsed detail page.
#[derive(Debug, Clone)]
pub struct FetchedResolution {
    pub resolution: Resolution,
    pub votes: Vec<VoteRecord>,
    pub tally: LineTally,
}

/// Fetches detail pages and turns them into votes.
pub struct RecordFetcher<'a, F> {
    fetcher: &'a F,
    base: Url,
    normalizer: CountryNormalizer,
    sentinel: SentinelFilter,
    vote_label: String,
}

impl<'a, F: Fetch> RecordFetcher<'a, F> {
    pub fn new(fetcher: &'a F, base: Url, sentinel: SentinelFilter) -> Self {
        Self {
            fetcher,
            base,
            normalizer: CountryNormalizer::default(),
            sentinel,
            vote_label: DEFAULT_VOTE_LABEL.to_string(),
        }
    }

    /// Look the vote block up under a different label.
    pub fn with_vote_label(mut self, label: impl Into<String>) -> Self {
        self.vote_label = label.into();
        self
    }

    /// Fetch and parse the detail page of resolution `id`.
    ///
    /// Only the request can fail; parse problems are tallied on the result.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, id: &str) -> Result<FetchedResolution, HarvestError> {
        let url = self.base.join(id)?;
        let html = self.fetcher.get(url.as_str()).await?;
        let fetched = self.parse(id, &html);
        info!(
            votes = fetched.votes.len(),
            rejected = fetched.tally.format_rejects + fetched.tally.normalization_rejects,
            "Parsed resolution"
        );
        Ok(fetched)
    }

    /// Parse a detail page already in memory.
    pub fn parse(&self, id: &str, html: &str) -> FetchedResolution {
        let document = Html::parse_document(html);
        let rows: Vec<ElementRef<'_>> = document.select(&ROW_SELECTOR).collect();
        let mut tally = LineTally::default();

        let mut field = |label: &str| {
            let value = find_field(&rows, label);
            if value.is_none() {
                tally.fields_missing += 1;
                warn!(error = %field_missing(label, id), "Metadata field missing");
            }
            value
        };
        let resolution = Resolution {
            id: id.to_string(),
            title: field(TITLE_LABEL),
            label: field(RESOLUTION_LABEL),
            vote_date: field(VOTE_DATE_LABEL),
        };

        let votes = match resolution.vote_date.as_deref() {
            None => Vec::new(),
            Some(date) if self.sentinel.excludes(date) => {
                tally.sentinel_skipped = true;
                info!(%id, vote_date = date, "Vote date in sentinel year; skipping country list");
                Vec::new()
            }
            Some(_) => self.parse_votes(id, &rows, &mut tally),
        };

        FetchedResolution {
            resolution,
            votes,
            tally,
        }
    }

    fn vote_block<'d>(&self, id: &str, rows: &[ElementRef<'d>], tally: &mut LineTally) -> Option<ElementRef<'d>> {
        let labelled = rows
            .iter()
            .find(|row| row_label(row).as_deref() == Some(self.vote_label.as_str()));
        if let Some(row) = labelled {
            return row.select(&VALUE_SELECTOR).last();
        }

        // Legacy layout: votes sit in the second-to-last block.
        let row = rows.len().checked_sub(2).map(|i| rows[i])?;
        let block = row.select(&VALUE_SELECTOR).last()?;
        tally.positional_fallback = true;
        warn!(
            %id,
            label = %self.vote_label,
            used = %row_label(&row).unwrap_or_default(),
            "Vote block label not found; using positional fallback"
        );
        Some(block)
    }

    fn parse_votes(&self, id: &str, rows: &[ElementRef<'_>], tally: &mut LineTally) -> Vec<VoteRecord> {
        let Some(block) = self.vote_block(id, rows, tally) else {
            tally.fields_missing += 1;
            warn!(error = %field_missing(&self.vote_label, id), "Vote block missing");
            return Vec::new();
        };

        let mut votes = Vec::new();
        for line in vote_lines(block) {
            if line.trim().is_empty() {
                continue;
            }
            tally.lines_examined += 1;

            let parsed = match parse_vote_line(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tally.format_rejects += 1;
                    warn!(%id, error = %e, "Skipping malformed vote line");
                    continue;
                }
            };
            match self.normalizer.normalize(&parsed.country_tokens) {
                Ok(country) => {
                    let record = VoteRecord {
                        resolution_id: id.to_string(),
                        country,
                        outcome: parsed.outcome,
                    };
                    trace!(
                        id = %record.resolution_id,
                        raw = %record.country.raw,
                        alpha2 = record.country.alpha2,
                        vote = %record.outcome,
                        "Recorded vote"
                    );
                    votes.push(record);
                }
                Err(e) => {
                    tally.normalization_rejects += 1;
                    debug!(%id, error = %e, "Dropping unrecognized country");
                }
            }
        }
        votes
    }
}
