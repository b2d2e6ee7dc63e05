//! Parsing and normalization of the vehicle data endpoint.

use serde_json::Value;

use crate::domain::{VehicleState, VehicleStatus};

use super::error::ScrapeError;

/// Name used when an entry has no `nombre`.
const UNKNOWN_NAME: &str = "??";

/// Parse the JSON returned by the vehicle data endpoint.
///
/// `carros` may be an object (its values are taken in document order) or an
/// array. Entries that aren't objects are skipped, as are vehicles that are
/// out of service. A missing, null or scalar `carros` yields an empty list.
pub fn parse_vehicles(body: &str) -> Result<Vec<VehicleStatus>, ScrapeError> {
    let body = body.trim_start_matches('\u{feff}');
    let value: Value = serde_json::from_str(body).map_err(|e| ScrapeError::Json {
        message: e.to_string(),
    })?;

    Ok(vehicles_from_value(&value))
}

/// Extract vehicles from an already-decoded payload.
pub fn vehicles_from_value(value: &Value) -> Vec<VehicleStatus> {
    let entries: Vec<&Value> = match value.get("carros") {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(list)) => list.iter().collect(),
        _ => Vec::new(),
    };

    entries.into_iter().filter_map(vehicle_from_entry).collect()
}

fn vehicle_from_entry(entry: &Value) -> Option<VehicleStatus> {
    let fields = entry.as_object()?;

    let name = fields
        .get("nombre")
        .and_then(text_of)
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());
    let raw_state = fields
        .get("estado_nombre")
        .and_then(text_of)
        .unwrap_or_default();

    let state = classify(&raw_state)?;
    Some(VehicleStatus::new(name, state))
}

/// Render a JSON scalar as text. Strings are taken verbatim; null is absent.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Map an upstream state label to a normalized state.
///
/// Matching is on the uppercased label. Returns `None` for vehicles that
/// are out of service ("FUERA"), which are not reported.
pub fn classify(raw_state: &str) -> Option<VehicleState> {
    let upper = raw_state.to_uppercase();

    if upper.contains("LLAMADO") {
        if upper.contains("DISPONIBLE") {
            Some(VehicleState::DisponibleEnLlamado)
        } else {
            Some(VehicleState::EnLlamado)
        }
    } else if upper.contains("FUERA") {
        None
    } else {
        Some(VehicleState::EnServicio)
    }
}
