//! Station records and the published snapshot.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::source::station_sort_key;
use super::vehicle::VehicleStatus;

/// Status of one station, produced fresh by every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRecord {
    /// Name of the source this record was built from.
    pub station_name: String,

    /// Number of personnel flagged as present on the station page.
    pub personnel_count: u32,

    /// Vehicles in upstream order, or a single `SISTEMA` sentinel.
    pub vehicles: Vec<VehicleStatus>,
}

impl StationRecord {
    pub fn new(
        station_name: impl Into<String>,
        personnel_count: u32,
        vehicles: Vec<VehicleStatus>,
    ) -> Self {
        Self {
            station_name: station_name.into(),
            personnel_count,
            vehicles,
        }
    }

    /// Record for a station whose page could not be fetched.
    pub fn unreachable(station_name: impl Into<String>) -> Self {
        Self::new(station_name, 0, vec![VehicleStatus::sin_conexion()])
    }

    /// Record for a station whose vehicle data could not be read.
    pub fn offline(station_name: impl Into<String>, personnel_count: u32) -> Self {
        Self::new(
            station_name,
            personnel_count,
            vec![VehicleStatus::offline()],
        )
    }

    /// Whether this record is a failure placeholder.
    pub fn is_degraded(&self) -> bool {
        matches!(self.vehicles.as_slice(), [only] if only.is_sentinel())
    }

    pub fn sort_key(&self) -> u64 {
        station_sort_key(&self.station_name)
    }
}

/// Sort records by the leading number of their station name.
///
/// The sort is stable, so records with equal keys keep their fetch order.
pub fn sort_records(records: &mut [StationRecord]) {
    records.sort_by_key(StationRecord::sort_key);
}

/// The complete set of records served to clients.
///
/// Never mutated once built; a refresh replaces the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<StationRecord>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The snapshot served before the first refresh completes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot, sorting the records.
    pub fn new(mut records: Vec<StationRecord>, fetched_at: DateTime<Utc>) -> Self {
        sort_records(&mut records);
        Self {
            records,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    /// When this snapshot was built, or `None` for the initial empty one.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Age of the snapshot at `now`. Clock skew backwards counts as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.fetched_at
            .map(|at| (now - at).to_std().unwrap_or(Duration::ZERO))
    }

    /// Whether the snapshot is older than `ttl` at `now`.
    ///
    /// A snapshot that was never fetched is always stale.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now).is_none_or(|age| age > ttl)
    }

    pub fn degraded_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_degraded()).count()
    }
}
