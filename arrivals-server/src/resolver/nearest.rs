//! Nearest-trip selection over one line's merged trips.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{LineTrips, MergedTrip, NearestTrip, TripId};

/// Find the trip with the earliest effective arrival strictly after `now`,
/// ignoring trips in `excluded`.
///
/// On equal arrivals the first trip in trip-id order wins.
pub fn earliest_upcoming<'a>(
    trips: &'a LineTrips,
    now: NaiveDateTime,
    excluded: &HashSet<TripId>,
) -> Option<(&'a TripId, &'a MergedTrip)> {
    let mut best: Option<(&TripId, &MergedTrip)> = None;

    for (trip_id, trip) in trips.iter() {
        if excluded.contains(trip_id) {
            continue;
        }

        let arrival = trip.effective_arrival();
        if arrival <= now {
            continue;
        }

        match best {
            Some((_, current)) if current.effective_arrival() <= arrival => {}
            _ => best = Some((trip_id, trip)),
        }
    }

    best
}

/// Select the next arrival from one service day's trips.
///
/// A selected trip whose real-time estimate is already at or before `now`
/// has reached the stop; it is dropped and the scan repeats without it.
pub fn select_nearest(trips: &LineTrips, now: NaiveDateTime) -> Option<NearestTrip> {
    let mut excluded = HashSet::new();

    loop {
        let (trip_id, trip) = earliest_upcoming(trips, now, &excluded)?;

        if trip.has_arrived(now) {
            debug!(trip = %trip_id, "skipping trip that has already arrived");
            excluded.insert(trip_id.clone());
            continue;
        }

        return Some(NearestTrip::from_trip(trip));
    }
}
