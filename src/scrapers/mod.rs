//! Scrapers for the UN voting sources.
//!
//! The voting-data scrapers follow a two-phase pattern:
//!
//! 1. **Indexing**: Discover resolution links from the search listing ([`listing`])
//! 2. **Fetching**: Download and parse each resolution's detail page ([`detail`])
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | UN Digital Library search | [`listing`] | HTML scraping | Paginated by record offset (`jrec`) |
//! | UN Digital Library record | [`detail`] | HTML scraping | Labelled metadata blocks, `<br>`-separated votes |
//! | Security Council veto list | [`veto`] | HTML scraping | Single table, newest first |
//!
//! # Common Patterns
//!
//! Scrapers use:
//! - The [`Fetch`](crate::http::Fetch) trait, so retries and test doubles plug in transparently
//! - Graceful error handling (failed pages and malformed lines are logged and skipped)
//! - Precompiled `once_cell` selectors

pub mod detail;
pub mod listing;
pub mod veto;
