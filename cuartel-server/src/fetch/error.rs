//! Station fetch error types.

use crate::scrape::ScrapeError;

/// Errors that can occur while fetching one station.
///
/// These never reach clients: the fetcher turns them into sentinel records.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, unreadable body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The station page has no vehicle data URL
    #[error("vehicle data URL not found in station page")]
    MissingDataUrl,

    /// The vehicle data could not be parsed
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// The concurrency limiter was closed
    #[error("fetch limiter closed")]
    LimiterClosed,

    /// The fetcher configuration is unusable
    #[error("invalid fetch configuration: {0}")]
    InvalidConfig(String),
}
