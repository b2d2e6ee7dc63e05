//! Scraping error types.

/// Errors from parsing upstream station data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    /// The vehicle data endpoint did not return valid JSON
    #[error("invalid vehicle data: {message}")]
    Json { message: String },
}
