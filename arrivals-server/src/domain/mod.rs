//! Domain types for the bus arrival resolver.
//!
//! Everything here is validated: identifiers are checked at construction,
//! arrival records always carry a parsed instant, and a `MergedTrip`
//! always has at least one of its scheduled and real-time halves.

mod ids;
mod snapshot;
mod time;
pub(crate) mod trip;
mod vehicle;

pub use ids::{InvalidId, LineId, StopId, TripId};
pub use snapshot::{LineFeed, LineTrips, StopFeed, StopSnapshot};
pub use time::{
    ServiceDay, TimeError, format_yyyymmdd, in_midnight_window, parse_clock_time, parse_timestamp,
    resolve_arrival,
};
pub use trip::{MergedTrip, NearestTrip, RealTimeArrival, ScheduledArrival};
pub use vehicle::VehiclePosition;
