//! Validated feed contents and the merged per-line view built from them.

use std::collections::BTreeMap;
use std::collections::btree_map;

use super::{LineId, MergedTrip, RealTimeArrival, ScheduledArrival, TripId};

/// Arrivals for one line at a stop, as reported by one feed response.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeed {
    pub line: LineId,
    pub scheduled: Vec<ScheduledArrival>,
    pub real_time: Vec<RealTimeArrival>,
}

/// One validated stop feed response.
///
/// Malformed records have already been dropped during conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StopFeed {
    /// Stop name, when the response carries one.
    pub stop_name: Option<String>,

    pub lines: Vec<LineFeed>,
}

impl StopFeed {
    /// An empty feed, used when a fetch fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of records across all lines.
    pub fn record_count(&self) -> usize {
        self.lines
            .iter()
            .map(|l| l.scheduled.len() + l.real_time.len())
            .sum()
    }
}

/// Merged trips for one line at one stop, keyed by trip id.
///
/// Iteration is in trip-id order, which makes every scan over the trips
/// deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineTrips {
    trips: BTreeMap<TripId, MergedTrip>,
}

impl LineTrips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn get(&self, trip_id: &TripId) -> Option<&MergedTrip> {
        self.trips.get(trip_id)
    }

    pub fn contains(&self, trip_id: &TripId) -> bool {
        self.trips.contains_key(trip_id)
    }

    /// Insert a trip under an explicit key, replacing any previous entry.
    pub fn insert(&mut self, trip_id: TripId, trip: MergedTrip) {
        self.trips.insert(trip_id, trip);
    }

    /// Set the scheduled half of a trip, creating the trip if needed.
    pub fn upsert_scheduled(&mut self, scheduled: ScheduledArrival) {
        match self.trips.entry(scheduled.trip_id.clone()) {
            btree_map::Entry::Occupied(mut e) => e.get_mut().set_scheduled(scheduled),
            btree_map::Entry::Vacant(e) => {
                e.insert(MergedTrip::from_scheduled(scheduled));
            }
        }
    }

    /// Set the real-time half of a trip, creating the trip if needed.
    pub fn upsert_real_time(&mut self, real_time: RealTimeArrival) {
        match self.trips.entry(real_time.trip_id.clone()) {
            btree_map::Entry::Occupied(mut e) => e.get_mut().set_real_time(real_time),
            btree_map::Entry::Vacant(e) => {
                e.insert(MergedTrip::from_real_time(real_time));
            }
        }
    }

    /// Iterate over `(trip id, trip)` pairs in trip-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&TripId, &MergedTrip)> {
        self.trips.iter()
    }

    pub fn trip_ids(&self) -> impl Iterator<Item = &TripId> {
        self.trips.keys()
    }

    /// All trips ordered by effective arrival.
    ///
    /// The sort is stable, so trips sharing an arrival keep trip-id order.
    pub fn by_arrival(&self) -> Vec<&MergedTrip> {
        let mut trips: Vec<&MergedTrip> = self.trips.values().collect();
        trips.sort_by_key(|t| t.effective_arrival());
        trips
    }
}

impl FromIterator<(TripId, MergedTrip)> for LineTrips {
    fn from_iter<I: IntoIterator<Item = (TripId, MergedTrip)>>(iter: I) -> Self {
        Self {
            trips: iter.into_iter().collect(),
        }
    }
}

/// Merged trips for every line in one stop feed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StopSnapshot {
    lines: BTreeMap<LineId, LineTrips>,
}

impl StopSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips for a line, if the feed mentioned it.
    pub fn line(&self, line: &LineId) -> Option<&LineTrips> {
        self.lines.get(line)
    }

    /// Trips for a line, creating an empty entry if needed.
    pub fn line_mut(&mut self, line: LineId) -> &mut LineTrips {
        self.lines.entry(line).or_default()
    }

    /// Take the trips for a line, or an empty set if the line is absent.
    pub fn into_line(mut self, line: &LineId) -> LineTrips {
        self.lines.remove(line).unwrap_or_default()
    }

    pub fn lines(&self) -> impl Iterator<Item = (&LineId, &LineTrips)> {
        self.lines.iter()
    }

    /// Total trips across all lines.
    pub fn trip_count(&self) -> usize {
        self.lines.values().map(LineTrips::len).sum()
    }
}
