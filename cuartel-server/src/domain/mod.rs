//! Domain types for station status.
//!
//! A [`Registry`] lists the upstream [`Source`]s. Each refresh turns every
//! source into one [`StationRecord`], and the records together form the
//! [`Snapshot`] served to clients.

mod source;
mod station;
mod vehicle;

pub use source::{Registry, Source, station_sort_key};
pub use station::{Snapshot, StationRecord, sort_records};
pub use vehicle::{SENTINEL_NAME, VehicleState, VehicleStatus};
