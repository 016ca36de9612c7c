//! Transit API response DTOs.
//!
//! These types map directly to the JSON returned by `/v2/parada` and
//! `/v2/busPosition`. Every scalar is optional and leniently decoded;
//! validation happens in `convert`.

use serde::Deserialize;

use super::lenient::{opt_bool, opt_f64, opt_string, vec_or_null};

/// Response from `GET /v2/parada/{stop}/{line}/{date?}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StopResponse {
    /// Stop metadata. The shape varies, so it is kept loosely typed.
    #[serde(default, deserialize_with = "vec_or_null")]
    pub parada: Vec<serde_json::Value>,

    /// Per-line arrivals.
    #[serde(default, deserialize_with = "vec_or_null")]
    pub lineas: Vec<LineDto>,
}

impl StopResponse {
    /// The stop name, if the metadata carries one.
    pub fn stop_name(&self) -> Option<String> {
        self.parada.iter().find_map(|p| {
            p.get("nombre")
                .and_then(|n| n.as_str())
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
        })
    }
}

/// Arrivals for one line.
#[derive(Debug, Clone, Deserialize)]
pub struct LineDto {
    #[serde(default, deserialize_with = "opt_string")]
    pub linea: Option<String>,

    /// Scheduled arrivals.
    #[serde(default, deserialize_with = "vec_or_null")]
    pub horarios: Vec<ScheduledDto>,

    /// Real-time arrivals.
    #[serde(default, deserialize_with = "vec_or_null")]
    pub realtime: Vec<RealTimeDto>,
}

/// A scheduled arrival entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledDto {
    #[serde(default, deserialize_with = "opt_string")]
    pub trip_id: Option<String>,

    /// Service-day clock time, e.g. `"08:10"` or `"25:05:00"`.
    #[serde(default, deserialize_with = "opt_string")]
    pub llegada: Option<String>,

    /// Full arrival timestamp.
    #[serde(rename = "fechaHoraLlegada", default, deserialize_with = "opt_string")]
    pub fecha_hora_llegada: Option<String>,

    #[serde(default, deserialize_with = "opt_string")]
    pub destino: Option<String>,
}

/// A real-time arrival entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RealTimeDto {
    #[serde(default, deserialize_with = "opt_string")]
    pub trip_id: Option<String>,

    #[serde(default, deserialize_with = "opt_string")]
    pub llegada: Option<String>,

    #[serde(rename = "fechaHoraLlegada", default, deserialize_with = "opt_string")]
    pub fecha_hora_llegada: Option<String>,

    #[serde(rename = "vehicleId", default, deserialize_with = "opt_string")]
    pub vehicle_id: Option<String>,

    /// Licence plate.
    #[serde(default, deserialize_with = "opt_string")]
    pub matricula: Option<String>,

    #[serde(default, deserialize_with = "opt_f64")]
    pub latitud: Option<f64>,

    #[serde(default, deserialize_with = "opt_f64")]
    pub longitud: Option<f64>,

    #[serde(default, deserialize_with = "opt_f64")]
    pub velocidad: Option<f64>,

    #[serde(default, deserialize_with = "opt_string")]
    pub estado: Option<String>,

    #[serde(default, deserialize_with = "opt_bool")]
    pub propagated_delay: Option<bool>,
}

/// One element of the `GET /v2/busPosition/{tripId}` array.
#[derive(Debug, Clone, Deserialize)]
pub struct BusPositionDto {
    #[serde(default, deserialize_with = "opt_f64")]
    pub latitud: Option<f64>,

    #[serde(default, deserialize_with = "opt_f64")]
    pub longitud: Option<f64>,

    #[serde(default, deserialize_with = "opt_f64")]
    pub velocidad: Option<f64>,

    #[serde(default, deserialize_with = "opt_string")]
    pub ocupacion: Option<String>,

    #[serde(default, deserialize_with = "opt_string")]
    pub timestamp: Option<String>,
}
