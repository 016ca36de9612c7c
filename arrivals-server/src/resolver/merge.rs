//! Feed and cross-day merging.

use crate::domain::{LineTrips, MergedTrip, StopFeed, StopSnapshot};

/// Merge a stop feed into per-line, per-trip records.
///
/// Every trip id in either the scheduled or the real-time list ends up in
/// exactly one `MergedTrip`. If a feed repeats a trip id within one list,
/// the later record wins.
pub fn merge_feed(feed: &StopFeed) -> StopSnapshot {
    let mut snapshot = StopSnapshot::new();

    for line in &feed.lines {
        let trips = snapshot.line_mut(line.line.clone());

        for scheduled in &line.scheduled {
            trips.upsert_scheduled(scheduled.clone());
        }
        for real_time in &line.real_time {
            trips.upsert_real_time(real_time.clone());
        }
    }

    snapshot
}

/// Merge two service days' trips for one line.
///
/// `day_a` is the base. Trips only in `day_b` are copied in. For trips in
/// both, the later real-time estimate and the earlier scheduled arrival
/// win; a half present on only one side is kept. This is not symmetric:
/// on equal timestamps `day_a` is kept.
pub fn merge_across_days(day_a: &LineTrips, day_b: &LineTrips) -> LineTrips {
    let mut merged = day_a.clone();

    for (trip_id, b) in day_b.iter() {
        let reconciled = match day_a.get(trip_id) {
            Some(a) => reconcile(a, b),
            None => b.clone(),
        };
        merged.insert(trip_id.clone(), reconciled);
    }

    merged
}

fn reconcile(a: &MergedTrip, b: &MergedTrip) -> MergedTrip {
    let real_time = prefer(a.real_time(), b.real_time(), |ra, rb| rb.arrival > ra.arrival);
    let scheduled = prefer(a.scheduled(), b.scheduled(), |sa, sb| sb.arrival < sa.arrival);

    MergedTrip::from_parts(scheduled.cloned(), real_time.cloned()).unwrap_or_else(|| a.clone())
}

/// Pick between two optional halves. `b_wins` decides when both exist.
fn prefer<'t, T>(a: Option<&'t T>, b: Option<&'t T>, b_wins: impl Fn(&T, &T) -> bool) -> Option<&'t T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b_wins(a, b) { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}
