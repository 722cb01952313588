//! HTTP transport with exponential backoff retry logic.
//!
//! Every page the pipeline reads goes through the [`Fetch`] trait, so the
//! scrapers never talk to `reqwest` directly.
//!
//! # Architecture
//!
//! - [`Fetch`]: Core trait, `get(url) -> document text`
//! - [`HttpFetcher`]: `reqwest`-backed implementation with a per-request timeout
//! - [`RetryFetch`]: Decorator that adds retry logic to any `Fetch` implementation
//!
//! # Retry Strategy
//!
//! - Only [retryable](HarvestError::is_retryable) failures are retried
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::HttpConfig;
use crate::error::HarvestError;
use rand::{rng, Rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Trait for fetching a document by URL.
///
/// This abstraction lets the scrapers run against the live site, a retrying
/// decorator, or canned pages in tests.
pub trait Fetch {
    /// Fetch `url` and return the response body as text.
    ///
    /// Non-success statuses are errors ([`HarvestError::Status`]).
    async fn get(&self, url: &str) -> Result<String, HarvestError>;
}

/// `reqwest`-backed [`Fetch`] implementation.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client that gives up on any single request after `timeout`.
    pub fn new(timeout: StdDuration) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| HarvestError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<String, HarvestError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| HarvestError::transport(url, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..max_jitter)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
    /// Upper bound of the random jitter added to each delay.
    max_jitter: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    /// Create a new retry wrapper around an existing [`Fetch`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new(Duration::from_secs(30))?;
    /// let fetcher = RetryFetch::new(http, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }

    /// Override the jitter bound (tests use zero for deterministic timing).
    pub fn with_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn delay_for(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<String, HarvestError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.get(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "get() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "get() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Build the retrying live fetcher described by `config`.
pub fn build_fetcher(config: &HttpConfig) -> Result<RetryFetch<HttpFetcher>, HarvestError> {
    let http = HttpFetcher::new(StdDuration::from_secs(config.request_timeout_secs))?;
    Ok(RetryFetch::new(
        http,
        config.max_retries,
        StdDuration::from_millis(config.retry_base_delay_ms),
    ))
}

/// Canned-page fetcher for tests.
#[cfg(test)]
pub mod testing {
    use super::Fetch;
    use crate::error::HarvestError;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves pages from memory and records every requested URL.
    ///
    /// Unknown URLs answer `404`. URLs registered with [`StaticFetcher::failing`]
    /// return a transport error that many times before serving their page.
    #[derive(Debug, Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        failures: Mutex<HashMap<String, usize>>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.pages.insert(url.into(), body.into());
            self
        }

        pub fn failing(self, url: impl Into<String>, times: usize) -> Self {
            self.failures.lock().unwrap().insert(url.into(), times);
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetch for StaticFetcher {
        async fn get(&self, url: &str) -> Result<String, HarvestError> {
            self.requests.lock().unwrap().push(url.to_string());
            if let Some(remaining) = self.failures.lock().unwrap().get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(HarvestError::transport(url, "connection reset by peer"));
                }
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| HarvestError::Status {
                    url: url.to_string(),
                    status: StatusCode::NOT_FOUND,
                })
        }
    }
}
