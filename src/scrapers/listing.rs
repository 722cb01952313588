//! Listing-page enumeration for the UN Digital Library voting collection.
//!
//! Enumerating one year takes two kinds of requests against `<base>/search`:
//!
//! 1. A **count query** at record offset 1, read for the `Vote` facet total.
//! 2. One **listing request** per window of `step` records, at record offsets
//!    `1, step + 1, 2 * step + 1, ...`.
//!
//! Window boundaries always derive from the record offset (`jrec`), never
//! from a page counter, so adjacent windows neither overlap nor leave gaps.

use crate::error::HarvestError;
use crate::http::Fetch;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_PAGE_STEP: u32 = 50;

static FACET_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.checkbox").unwrap());
static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());
static RESULT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.moreinfo").unwrap());
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.moreinfo[href]").unwrap());
static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").unwrap());

/// Record offsets of every listing request needed to cover `total` results.
///
/// `listing_offsets(120, 50)` is `[1, 51, 101]`; zero results need no request.
pub fn listing_offsets(total: u32, step: u32) -> Vec<u32> {
    if step == 0 {
        return Vec::new();
    }
    (0..total.div_ceil(step)).map(|i| step * i + 1).collect()
}

/// Read the `Vote` facet total from a search page.
///
/// A page without the facet has no matching records and counts as zero.
pub fn parse_result_count(html: &str) -> Result<u32, HarvestError> {
    let document = Html::parse_document(html);
    for facet in document.select(&FACET_SELECTOR) {
        let spans: Vec<String> = facet
            .select(&SPAN_SELECTOR)
            .map(|s| s.text().collect::<String>().trim().to_string())
            .collect();
        if spans.first().map(String::as_str) != Some("Vote") {
            continue;
        }
        let raw = spans.get(1).map(String::as_str).unwrap_or_default();
        return COUNT_RE
            .find(raw)
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
            .ok_or_else(|| HarvestError::Format {
                line: raw.to_string(),
                reason: "unreadable result count",
            });
    }
    Ok(0)
}

/// Extract resolution links from a listing page in document order.
///
/// Each result block contributes its first `a.moreinfo` link. Repeated links
/// keep their first position.
pub fn parse_listing(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_SELECTOR)
        .filter_map(|record| {
            record
                .select(&LINK_SELECTOR)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })
        .unique()
        .collect()
}

/// One fetched window of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub year: i32,
    /// 1-based record offset of the first entry.
    pub offset: u32,
    /// Resolution identifiers in document order.
    pub ids: Vec<String>,
}

/// Discovers the resolution identifiers of a year.
pub struct PageEnumerator<'a, F> {
    fetcher: &'a F,
    base: Url,
    collection: String,
    step: u32,
}

impl<'a, F: Fetch> PageEnumerator<'a, F> {
    pub fn new(fetcher: &'a F, base: Url, collection: impl Into<String>, step: u32) -> Self {
        Self {
            fetcher,
            base,
            collection: collection.into(),
            step,
        }
    }

    /// The search URL for `year` starting at record `offset`.
    pub fn listing_url(&self, year: i32, offset: u32) -> Result<Url, HarvestError> {
        let mut url = self.base.join("search")?;
        url.query_pairs_mut()
            .append_pair("ln", "en")
            .append_pair("c", &self.collection)
            .append_pair("jrec", &offset.to_string())
            .append_pair("fct__3", &year.to_string())
            .append_pair("cc", &self.collection)
            .append_pair("fct__9", "Vote")
            .append_pair("fct__9", "Vote");
        Ok(url)
    }

    /// Total number of voted resolutions recorded for `year`.
    #[instrument(level = "info", skip(self))]
    pub async fn result_count(&self, year: i32) -> Result<u32, HarvestError> {
        let url = self.listing_url(year, 1)?;
        let html = self.fetcher.get(url.as_str()).await?;
        let total = parse_result_count(&html)?;
        info!(
            total,
            pages = total.div_ceil(self.step.max(1)),
            "Counted resolutions"
        );
        Ok(total)
    }

    /// Fetch the listing window starting at record `offset`.
    #[instrument(level = "debug", skip(self))]
    pub async fn listing_page(&self, year: i32, offset: u32) -> Result<ListingPage, HarvestError> {
        let url = self.listing_url(year, offset)?;
        let html = self.fetcher.get(url.as_str()).await?;
        let ids = parse_listing(&html);
        debug!(count = ids.len(), ids = ?ids, "Indexed resolution links");
        Ok(ListingPage { year, offset, ids })
    }

    /// Lazily enumerate every listing page of `year`.
    ///
    /// The stream issues the count query when first polled and then one
    /// listing request per window. A failed window yields an `Err` item and
    /// the stream moves on to the next one. Calling `enumerate` again
    /// restarts from the count query.
    pub fn enumerate(&self, year: i32) -> impl Stream<Item = Result<ListingPage, HarvestError>> + '_ {
        stream::once(self.result_count(year))
            .map_ok(move |total| {
                stream::iter(listing_offsets(total, self.step))
                    .then(move |offset| self.listing_page(year, offset))
            })
            .try_flatten()
    }
}
