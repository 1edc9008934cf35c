//! Error types for the collector
//!
//! Fetch and parse failures are per-page: the crawl loops log and count them
//! and move on. `CollectorError` is what the subcommands return.

use thiserror::Error;

/// Page fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0} for {1}")]
    Status(u16, String),

    #[error("CAPTCHA challenge at {0}")]
    Captcha(String),

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Whether another attempt may succeed, given the configured status list
    pub fn is_retryable(&self, retry_status_codes: &[u16]) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(code, _) => retry_status_codes.contains(code),
            FetchError::Captcha(_) | FetchError::RetriesExhausted { .. } => false,
        }
    }
}

/// Tracklist page parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("No event name on page")]
    MissingEvent,

    #[error("No tracks on page")]
    NoTracks,

    #[error("Invalid selector {0}")]
    Selector(String),
}

/// Collector operation error
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// collector-common error (config, store I/O, database)
    #[error(transparent)]
    Common(#[from] collector_common::Error),
}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        CollectorError::Common(collector_common::Error::Database(err))
    }
}

impl From<std::io::Error> for CollectorError {
    fn from(err: std::io::Error) -> Self {
        CollectorError::Common(collector_common::Error::Io(err))
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        CollectorError::Common(collector_common::Error::Json(err))
    }
}

/// Convenience result type for collector operations
pub type CollectorResult<T> = Result<T, CollectorError>;
