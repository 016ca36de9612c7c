//! Selection of the arrivals after the nearest one.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{LineTrips, MergedTrip, NearestTrip, in_midnight_window};

/// Whether any trip in the pool arrives strictly after the nearest one.
pub fn has_later_trips(nearest: &NearestTrip, trips: &LineTrips) -> bool {
    trips
        .iter()
        .any(|(_, t)| t.effective_arrival() > nearest.effective_arrival)
}

/// The `n` trips following the nearest one in the same pool.
///
/// The nearest trip is located by its scheduled trip id in the pool
/// sorted by effective arrival. A nearest trip without a schedule record
/// cannot be located and yields nothing. Trips sharing an effective
/// arrival are collapsed to the first in trip-id order.
pub fn following_nearest(nearest: &NearestTrip, trips: &LineTrips, n: usize) -> Vec<MergedTrip> {
    let Some(scheduled_id) = nearest.scheduled.as_ref().map(|s| &s.trip_id) else {
        return Vec::new();
    };

    let sorted = trips.by_arrival();
    let Some(position) = sorted
        .iter()
        .position(|t| t.scheduled().is_some_and(|s| &s.trip_id == scheduled_id))
    else {
        return Vec::new();
    };

    let later = sorted[position + 1..]
        .iter()
        .copied()
        .filter(|t| t.effective_arrival() > nearest.effective_arrival);

    distinct_arrivals(later).take(n).cloned().collect()
}

/// The first entries of another service day's pool, in arrival order.
///
/// With `skip_first` set, the earliest entry is dropped: it is taken to
/// duplicate or precede the nearest trip. As in [`following_nearest`],
/// equal arrivals are collapsed.
pub fn fallback_entries(pool: &LineTrips, n: usize, skip_first: bool) -> Vec<MergedTrip> {
    distinct_arrivals(pool.by_arrival().into_iter())
        .skip(usize::from(skip_first))
        .take(n)
        .cloned()
        .collect()
}

/// Drop trips whose effective arrival equals the previous one's. Input
/// must be sorted by effective arrival.
fn distinct_arrivals<'t>(
    sorted: impl Iterator<Item = &'t MergedTrip>,
) -> impl Iterator<Item = &'t MergedTrip> {
    let mut last = None;
    sorted.filter(move |t| {
        let arrival = t.effective_arrival();
        let fresh = last != Some(arrival);
        last = Some(arrival);
        fresh
    })
}

/// The service date to fetch when the pool the nearest trip came from has
/// nothing later.
///
/// Starts from the calendar date of the nearest trip's scheduled arrival
/// (its effective arrival if unscheduled). In the midnight window, a
/// nearest trip that also falls in the window belongs to the previous
/// service day. The result is never earlier than the day after
/// `pool_date`, since that pool is already exhausted.
///
/// A nearest trip drawn from the pool arrives on `pool_date` or, past
/// 24:00, the day after, so for those the floor always decides and the
/// result is `pool_date + 1`. The midnight step only matters for a
/// nearest trip supplied from elsewhere.
pub fn fallback_service_date(
    nearest: &NearestTrip,
    pool_date: NaiveDate,
    now: NaiveDateTime,
    midnight_window_end_hour: u32,
) -> NaiveDate {
    let arrival = nearest
        .scheduled
        .as_ref()
        .map_or(nearest.effective_arrival, |s| s.arrival);

    let mut date = arrival.date();
    if in_midnight_window(now, midnight_window_end_hour)
        && in_midnight_window(arrival, midnight_window_end_hour)
    {
        date = date.pred_opt().unwrap_or(date);
    }

    if date <= pool_date {
        date = pool_date.succ_opt().unwrap_or(pool_date);
    }

    date
}
