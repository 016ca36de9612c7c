//! Arrival resolution for one stop and line.
//!
//! Answers "when is the next bus, and the few after it?" by merging the
//! feed's scheduled and real-time records per trip, then picking by
//! effective arrival (real-time estimate when present, schedule otherwise).
//!
//! Service days do not line up with calendar days: trips running shortly
//! after midnight are listed under the previous day's feed, so during the
//! midnight window both days are fetched and merged.

mod config;
mod merge;
mod nearest;
mod resolve;
mod upcoming;

pub use config::ResolverConfig;
pub use merge::{merge_across_days, merge_feed};
pub use nearest::{earliest_upcoming, select_nearest};
pub use resolve::{ArrivalBoard, ArrivalResolver};
pub use upcoming::{fallback_entries, fallback_service_date, following_nearest, has_later_trips};

use std::future::Future;

use crate::domain::{StopFeed, TripId, VehiclePosition};
use crate::feed::{FeedError, FeedQuery};

/// Source of stop feeds and vehicle positions.
///
/// This abstraction allows the resolver to run against the live API, a
/// cache in front of it, or fixture data.
pub trait FeedProvider: Send + Sync {
    /// Fetch the feed for one stop, line and service day.
    fn stop_feed(
        &self,
        query: &FeedQuery,
    ) -> impl Future<Output = Result<StopFeed, FeedError>> + Send;

    /// Fetch the last known position of the vehicle running a trip.
    fn bus_position(
        &self,
        trip: &TripId,
    ) -> impl Future<Output = Result<Option<VehiclePosition>, FeedError>> + Send;
}
