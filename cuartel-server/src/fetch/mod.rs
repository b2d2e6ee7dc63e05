//! Fetching of upstream station data.

mod client;
mod error;

use std::future::Future;

use crate::domain::{Source, StationRecord};

pub use client::{FetchConfig, StationFetcher};
pub use error::FetchError;

/// Something that can produce a station record for a source.
///
/// Implementations must not fail: unreadable sources are reported as
/// sentinel records. This is the seam the snapshot cache is tested through.
pub trait StationFetch: Send + Sync + 'static {
    fn fetch_station(&self, source: &Source) -> impl Future<Output = StationRecord> + Send;
}
