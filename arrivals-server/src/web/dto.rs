//! Data transfer objects for web requests and responses.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{MergedTrip, NearestTrip, RealTimeArrival, ScheduledArrival, VehiclePosition};
use crate::tracking::TrackedLine;

/// Wall-clock display format for arrival times.
const TIME_FORMAT: &str = "%H:%M";

/// Full timestamp format.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Query parameters for the upcoming arrivals endpoint.
#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    /// Number of arrivals (defaults to the configured count)
    pub count: Option<usize>,
}

/// Request to start tracking a stop and line.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub stop: String,
    pub line: String,
}

/// One arrival as shown to the user.
#[derive(Debug, Serialize)]
pub struct ArrivalView {
    pub trip_id: String,

    /// Effective arrival, `HH:MM`
    pub arrival: String,

    /// Effective arrival, full timestamp
    pub arrival_at: String,

    /// Whole minutes from now until arrival (negative if past)
    pub minutes_away: i64,

    /// Whether `arrival` comes from a real-time estimate
    pub is_real_time: bool,

    pub destination: Option<String>,

    /// Scheduled arrival, `HH:MM`
    pub scheduled_arrival: Option<String>,

    /// Real-time vehicle details, when tracked
    pub vehicle: Option<VehicleView>,
}

/// Real-time details of the vehicle running a trip.
#[derive(Debug, Serialize)]
pub struct VehicleView {
    pub vehicle_id: Option<String>,
    pub plate_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub status: Option<String>,

    /// Estimate inferred from a delay further up the line
    pub propagated_delay: Option<bool>,
}

impl VehicleView {
    fn from_real_time(rt: &RealTimeArrival) -> Self {
        Self {
            vehicle_id: rt.vehicle_id.clone(),
            plate_number: rt.plate_number.clone(),
            latitude: rt.latitude,
            longitude: rt.longitude,
            speed: rt.speed,
            status: rt.status.clone(),
            propagated_delay: rt.propagated_delay,
        }
    }
}

impl ArrivalView {
    fn build(
        trip_id: String,
        arrival: NaiveDateTime,
        destination: Option<String>,
        scheduled: Option<&ScheduledArrival>,
        real_time: Option<&RealTimeArrival>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            trip_id,
            arrival: arrival.format(TIME_FORMAT).to_string(),
            arrival_at: arrival.format(TIMESTAMP_FORMAT).to_string(),
            minutes_away: (arrival - now).num_minutes(),
            is_real_time: real_time.is_some(),
            destination,
            scheduled_arrival: scheduled.map(|s| s.arrival.format(TIME_FORMAT).to_string()),
            vehicle: real_time.map(VehicleView::from_real_time),
        }
    }

    /// View of the nearest trip.
    pub fn from_nearest(nearest: &NearestTrip, now: NaiveDateTime) -> Self {
        Self::build(
            nearest.trip_id.to_string(),
            nearest.effective_arrival,
            nearest.destination.clone(),
            nearest.scheduled.as_ref(),
            nearest.real_time.as_ref(),
            now,
        )
    }

    /// View of a following trip.
    pub fn from_trip(trip: &MergedTrip, now: NaiveDateTime) -> Self {
        Self::build(
            trip.trip_id().to_string(),
            trip.effective_arrival(),
            trip.destination().map(str::to_string),
            trip.scheduled(),
            trip.real_time(),
            now,
        )
    }
}

/// Last known vehicle position.
#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub trip_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub occupancy: Option<String>,
    pub timestamp: Option<String>,
}

impl PositionResponse {
    pub fn new(trip_id: String, position: &VehiclePosition) -> Self {
        Self {
            trip_id,
            latitude: position.latitude,
            longitude: position.longitude,
            speed: position.speed,
            occupancy: position.occupancy.clone(),
            timestamp: position
                .timestamp
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

/// A tracked stop and line with its latest arrivals.
#[derive(Debug, Serialize)]
pub struct TrackedView {
    pub stop: String,
    pub line: String,

    /// `None` until the first refresh completes, or when there is no service
    pub nearest: Option<ArrivalView>,
    pub upcoming: Vec<ArrivalView>,

    /// When the arrivals were last refreshed
    pub updated_at: Option<String>,
}

impl TrackedView {
    pub fn from_tracked(tracked: &TrackedLine, now: NaiveDateTime) -> Self {
        let entry = tracked.entry.as_ref();
        Self {
            stop: tracked.stop.to_string(),
            line: tracked.line.to_string(),
            nearest: entry
                .and_then(|e| e.nearest.as_ref())
                .map(|n| ArrivalView::from_nearest(n, now)),
            upcoming: entry
                .map(|e| {
                    e.upcoming
                        .iter()
                        .map(|t| ArrivalView::from_trip(t, now))
                        .collect()
                })
                .unwrap_or_default(),
            updated_at: entry.map(|e| e.updated_at.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

/// Response listing tracked lines.
#[derive(Debug, Serialize)]
pub struct TrackedResponse {
    pub tracked: Vec<TrackedView>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trip::fixtures::*;

    #[test]
    fn nearest_view_formats_times() {
        let trip = both("T1", at(8, 10), at(8, 17));
        let nearest = NearestTrip::from_trip(&trip);

        let view = ArrivalView::from_nearest(&nearest, at(8, 5));
        assert_eq!(view.trip_id, "T1");
        assert_eq!(view.arrival, "08:17");
        assert_eq!(view.arrival_at, "2024-03-15T08:17:00");
        assert_eq!(view.minutes_away, 12);
        assert!(view.is_real_time);
        assert_eq!(view.scheduled_arrival.as_deref(), Some("08:10"));
        assert_eq!(view.vehicle.unwrap().vehicle_id.as_deref(), Some("V1"));
    }

    #[test]
    fn scheduled_only_trip_has_no_vehicle() {
        let trip = MergedTrip::from_scheduled(scheduled("T2", at(8, 25)));

        let view = ArrivalView::from_trip(&trip, at(8, 5));
        assert!(!view.is_real_time);
        assert!(view.vehicle.is_none());
        assert_eq!(view.destination.as_deref(), Some("Destination of T2"));
    }

    #[test]
    fn serializes_absent_fields_as_null() {
        let trip = MergedTrip::from_real_time(real_time("X1", at(8, 7)));
        let json = serde_json::to_value(ArrivalView::from_trip(&trip, at(8, 5))).unwrap();

        assert_eq!(json["destination"], serde_json::Value::Null);
        assert_eq!(json["scheduled_arrival"], serde_json::Value::Null);
        assert_eq!(json["minutes_away"], 2);
    }
}
