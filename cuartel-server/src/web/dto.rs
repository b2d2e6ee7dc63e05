//! Data transfer objects for web responses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Snapshot, StationRecord, VehicleStatus};

/// A station as sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct StationResult {
    /// Station name
    pub nombre_cuartel: String,

    /// Personnel present, as a decimal string. Omitted when disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal: Option<String>,

    /// Vehicles, or a single `SISTEMA` sentinel
    pub carros: Vec<VehicleStatus>,
}

impl StationResult {
    pub fn from_record(record: &StationRecord, include_personnel: bool) -> Self {
        Self {
            nombre_cuartel: record.station_name.clone(),
            personal: include_personnel.then(|| record.personnel_count.to_string()),
            carros: record.vehicles.clone(),
        }
    }
}

/// Convert a snapshot into the `/api/carros` payload.
pub fn station_results(snapshot: &Snapshot, include_personnel: bool) -> Vec<StationResult> {
    snapshot
        .records()
        .iter()
        .map(|r| StationResult::from_record(r, include_personnel))
        .collect()
}

/// Cache freshness report.
#[derive(Debug, Serialize)]
pub struct CacheStatusResponse {
    /// Stations in the published snapshot
    pub cuarteles: usize,

    /// Stations whose data could not be read
    pub degradados: usize,

    /// When the snapshot was built
    pub actualizado: Option<DateTime<Utc>>,

    /// Age of the snapshot in seconds
    pub antiguedad_segundos: Option<u64>,

    /// Whether a refresh is in flight
    pub actualizando: bool,

    /// Configured time to live in seconds
    pub ttl_segundos: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
