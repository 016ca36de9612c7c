//! Live vehicle position for a trip.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Last reported position of the vehicle running a trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehiclePosition {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,

    /// Occupancy level as reported by the operator.
    pub occupancy: Option<String>,

    /// When the position was recorded.
    pub timestamp: Option<NaiveDateTime>,
}

impl VehiclePosition {
    /// Whether both coordinates are known, i.e. the vehicle can be placed
    /// on a map.
    pub fn has_fix(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}
