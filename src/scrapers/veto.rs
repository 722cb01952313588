//! Security Council veto list scraper.
//!
//! The Dag Hammarskjöld Library publishes every vetoed draft resolution as a
//! single HTML table, newest first. After three header rows each row reads:
//!
//! | cell | content |
//! |------|---------|
//! | 0 | meeting date (year last) |
//! | 1 | draft resolution symbol |
//! | 2 | meeting record |
//! | 3 | agenda item |
//! | 4 | permanent member(s) casting the veto |
//!
//! Scraping stops at the first row dated at or before the configured start
//! year.

use crate::config::VetoConfig;
use crate::country::{contains, rewrite, Rule};
use crate::error::HarvestError;
use crate::http::Fetch;
use crate::models::VetoRow;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

const HEADER_ROWS: usize = 3;

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

/// Agenda items condensed to their key words, in priority order.
pub const TOPIC_RULES: &[Rule] = &[
    contains("Letter", "Ukraine"),
    contains("Palestinian", "Palestine"),
    contains("Syria", "Syria"),
    contains("Middle East", "Middle East"),
    contains("Central America", "Central America"),
    contains("Bosnia and Herzegovina", "Bosnia and Herzegovina"),
    contains("Venezuela", "Venezuela"),
    contains("international peace", "International peace"),
    contains("occupied Arab territories", "Occupied Arab territories"),
    contains("Yugoslav Republic of Macedonia", "Yugoslav Republic of Macedonia"),
    contains("Cyprus", "Cyprus"),
];

/// Reduce an agenda item to its key words.
pub fn condense_topic(topic: &str) -> &str {
    rewrite(TOPIC_RULES, topic)
}

/// Split the veto cell into individual members.
///
/// Joint vetoes are printed as one cell mentioning China; they expand to
/// China and the Russian Federation.
pub fn vetoing_members(cell: &str) -> Vec<String> {
    if cell.contains("China") && cell.len() > "China".len() {
        vec!["China".to_string(), "Russian Federation".to_string()]
    } else {
        vec![cell.to_string()]
    }
}

/// Rows scraped from the veto table plus the rows that could not be read.
#[derive(Debug, Clone, Default)]
pub struct VetoHarvest {
    pub rows: Vec<VetoRow>,
    pub rejected: usize,
}

/// Parse the veto table, keeping rows dated after `start_year`.
pub fn parse_veto_table(html: &str, start_year: i32) -> VetoHarvest {
    let document = Html::parse_document(html);
    let mut harvest = VetoHarvest::default();

    for row in document.select(&ROW_SELECTOR).skip(HEADER_ROWS) {
        let cells: Vec<String> = row
            .select(&CELL_SELECTOR)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 5 {
            harvest.rejected += 1;
            warn!(cells = cells.len(), "Veto row has too few cells; skipping");
            continue;
        }

        let Some(year) = YEAR_RE
            .find_iter(&cells[0])
            .last()
            .and_then(|m| m.as_str().parse::<i32>().ok())
        else {
            harvest.rejected += 1;
            warn!(date = %cells[0], "Veto row has no year; skipping");
            continue;
        };
        if year <= start_year {
            break;
        }

        let topic = condense_topic(&cells[3]);
        for country in vetoing_members(&cells[4]) {
            harvest.rows.push(VetoRow {
                vote_date: year.to_string(),
                resolution: cells[1].clone(),
                topic: topic.to_string(),
                country,
            });
        }
    }
    harvest
}

/// Fetch and parse the veto table.
#[instrument(level = "info", skip_all, fields(url = %config.url))]
pub async fn harvest<F: Fetch>(fetcher: &F, config: &VetoConfig) -> Result<VetoHarvest, HarvestError> {
    let html = fetcher.get(&config.url).await?;
    let harvest = parse_veto_table(&html, config.start_year);
    info!(
        rows = harvest.rows.len(),
        rejected = harvest.rejected,
        start_year = config.start_year,
        "Parsed veto table"
    );
    Ok(harvest)
}
