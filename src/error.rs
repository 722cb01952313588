//! Error taxonomy for the harvesting pipeline.
//!
//! Every failure the pipeline can observe maps onto one [`HarvestError`]
//! variant. The variants split into two groups:
//!
//! - **Local** failures (`Transport`, `Status`, `FieldMissing`, `Format`,
//!   `Normalization`) concern one page, one resolution or one vote line.
//!   They are logged and counted, and never abort sibling work.
//! - **Fatal** failures (`Config` and the sink/config wrappers) stop the run.
//!
//! Only transport-level failures are worth retrying; see
//! [`HarvestError::is_retryable`].

use reqwest::StatusCode;
use std::error::Error as StdError;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = HarvestError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The server answered with a non-success status.
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },

    /// An expected metadata label was absent from a page.
    #[error("field `{label}` missing on {context}")]
    FieldMissing { label: String, context: String },

    /// A vote line (or veto table row) could not be tokenized.
    #[error("malformed line {line:?}: {reason}")]
    Format { line: String, reason: &'static str },

    /// A reconstructed country name has no ISO 3166 alpha-2 code.
    #[error("country {name:?} not found in ISO 3166 registry")]
    Normalization { name: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl HarvestError {
    /// Build a [`HarvestError::Transport`] from any error source.
    pub fn transport(url: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        HarvestError::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        HarvestError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt at the same request could succeed.
    ///
    /// Transport failures, `429 Too Many Requests` and 5xx answers are
    /// retryable. Other 4xx answers and all parse/config failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            HarvestError::Transport { .. } => true,
            HarvestError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_is_retryable() {
        let e = HarvestError::transport("http://x", "connection reset");
        assert!(e.is_retryable());
        assert!(e.to_string().contains("connection reset"));
    }

    #[test]
    fn test_status_retryability() {
        let server = HarvestError::Status {
            url: "http://x".into(),
            status: StatusCode::BAD_GATEWAY,
        };
        let throttled = HarvestError::Status {
            url: "http://x".into(),
            status: StatusCode::TOO_MANY_REQUESTS,
        };
        let missing = HarvestError::Status {
            url: "http://x".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(server.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!missing.is_retryable());
    }

    #[test]
    fn test_parse_failures_are_not_retryable() {
        let e = HarvestError::Format {
            line: "   ".into(),
            reason: "no tokens",
        };
        assert!(!e.is_retryable());
        assert!(!HarvestError::Config("bad".into()).is_retryable());
    }
}
