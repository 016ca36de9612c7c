//! Arrival records and the per-trip merge of scheduled and real-time data.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::TripId;

/// A scheduled arrival of a trip at a stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledArrival {
    pub trip_id: TripId,

    /// Timetabled arrival instant.
    pub arrival: NaiveDateTime,

    /// Headsign shown to passengers. Only scheduled records carry one.
    pub destination: Option<String>,
}

/// A real-time arrival estimate for a trip at a stop.
///
/// Every vehicle field is optional: the API omits whatever it does not
/// know, and an absent value is kept distinct from zero or empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealTimeArrival {
    pub trip_id: TripId,

    /// Estimated arrival instant.
    pub arrival: NaiveDateTime,

    pub vehicle_id: Option<String>,

    /// Licence plate of the vehicle.
    pub plate_number: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Speed as reported by the vehicle.
    pub speed: Option<f64>,

    /// Operator status string, passed through verbatim.
    pub status: Option<String>,

    /// True when the estimate was inferred from a delay at an earlier stop
    /// rather than measured for this stop.
    pub propagated_delay: Option<bool>,
}

/// Scheduled and real-time data for one trip.
///
/// A trip may be known only from the schedule (not yet tracked), only in
/// real time (extra service), or both. A `MergedTrip` with neither is
/// never constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTrip {
    scheduled: Option<ScheduledArrival>,
    real_time: Option<RealTimeArrival>,
}

impl MergedTrip {
    /// A trip known from the schedule.
    pub fn from_scheduled(scheduled: ScheduledArrival) -> Self {
        Self {
            scheduled: Some(scheduled),
            real_time: None,
        }
    }

    /// A trip known from real-time data.
    pub fn from_real_time(real_time: RealTimeArrival) -> Self {
        Self {
            scheduled: None,
            real_time: Some(real_time),
        }
    }

    /// Build a trip from optional parts.
    ///
    /// Returns `None` when both halves are missing.
    pub fn from_parts(
        scheduled: Option<ScheduledArrival>,
        real_time: Option<RealTimeArrival>,
    ) -> Option<Self> {
        if scheduled.is_none() && real_time.is_none() {
            return None;
        }
        Some(Self {
            scheduled,
            real_time,
        })
    }

    pub fn scheduled(&self) -> Option<&ScheduledArrival> {
        self.scheduled.as_ref()
    }

    pub fn real_time(&self) -> Option<&RealTimeArrival> {
        self.real_time.as_ref()
    }

    /// Replace the scheduled half.
    pub fn set_scheduled(&mut self, scheduled: ScheduledArrival) {
        self.scheduled = Some(scheduled);
    }

    /// Replace the real-time half.
    pub fn set_real_time(&mut self, real_time: RealTimeArrival) {
        self.real_time = Some(real_time);
    }

    /// The real-time arrival if present, else the scheduled one.
    pub fn effective_arrival(&self) -> NaiveDateTime {
        match (&self.real_time, &self.scheduled) {
            (Some(rt), _) => rt.arrival,
            (None, Some(s)) => s.arrival,
            (None, None) => unreachable!("MergedTrip always has at least one half"),
        }
    }

    /// The trip id, preferring the real-time copy.
    pub fn trip_id(&self) -> &TripId {
        match (&self.real_time, &self.scheduled) {
            (Some(rt), _) => &rt.trip_id,
            (None, Some(s)) => &s.trip_id,
            (None, None) => unreachable!("MergedTrip always has at least one half"),
        }
    }

    /// The scheduled destination, if any.
    pub fn destination(&self) -> Option<&str> {
        self.scheduled.as_ref()?.destination.as_deref()
    }

    /// Whether a real-time estimate says the vehicle has already reached
    /// the stop.
    pub fn has_arrived(&self, now: NaiveDateTime) -> bool {
        self.real_time.as_ref().is_some_and(|rt| rt.arrival <= now)
    }
}

/// The trip judged to arrive next at a stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestTrip {
    pub trip_id: TripId,

    /// Real-time arrival if present, else scheduled.
    pub effective_arrival: NaiveDateTime,

    pub destination: Option<String>,

    pub scheduled: Option<ScheduledArrival>,
    pub real_time: Option<RealTimeArrival>,
}

impl NearestTrip {
    /// Annotate a merged trip as the nearest arrival.
    pub fn from_trip(trip: &MergedTrip) -> Self {
        Self {
            trip_id: trip.trip_id().clone(),
            effective_arrival: trip.effective_arrival(),
            destination: trip.destination().map(str::to_string),
            scheduled: trip.scheduled().cloned(),
            real_time: trip.real_time().cloned(),
        }
    }
}
