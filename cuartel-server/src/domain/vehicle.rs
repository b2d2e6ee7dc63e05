//! Vehicle status types.

use std::fmt;

use serde::Serialize;

/// Vehicle name used for sentinel entries.
pub const SENTINEL_NAME: &str = "SISTEMA";

/// Normalized status of a vehicle.
///
/// The last two variants only appear on the `SISTEMA` sentinel entry,
/// which stands in for the whole vehicle list of an unreadable station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VehicleState {
    #[serde(rename = "EN SERVICIO")]
    EnServicio,

    #[serde(rename = "EN LLAMADO")]
    EnLlamado,

    #[serde(rename = "DISPONIBLE EN LLAMADO")]
    DisponibleEnLlamado,

    /// The station page was reachable but its vehicle data was not.
    #[serde(rename = "OFFLINE")]
    Offline,

    /// The station page itself could not be fetched.
    #[serde(rename = "SIN CONEXIÓN")]
    SinConexion,
}

impl VehicleState {
    /// The label sent to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleState::EnServicio => "EN SERVICIO",
            VehicleState::EnLlamado => "EN LLAMADO",
            VehicleState::DisponibleEnLlamado => "DISPONIBLE EN LLAMADO",
            VehicleState::Offline => "OFFLINE",
            VehicleState::SinConexion => "SIN CONEXIÓN",
        }
    }

    /// Whether this state marks a failed source rather than a real vehicle.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, VehicleState::Offline | VehicleState::SinConexion)
    }
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single vehicle and its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleStatus {
    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "estado")]
    pub state: VehicleState,
}

impl VehicleStatus {
    pub fn new(name: impl Into<String>, state: VehicleState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }

    /// Sentinel for a station whose vehicle data could not be read.
    pub fn offline() -> Self {
        Self::new(SENTINEL_NAME, VehicleState::Offline)
    }

    /// Sentinel for a station whose page could not be fetched.
    pub fn sin_conexion() -> Self {
        Self::new(SENTINEL_NAME, VehicleState::SinConexion)
    }

    pub fn is_sentinel(&self) -> bool {
        self.name == SENTINEL_NAME && self.state.is_sentinel()
    }
}
