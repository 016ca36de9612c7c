//! Transit API client.
//!
//! This module provides an HTTP client for the municipal transit API,
//! which serves per-stop scheduled and real-time arrivals.
//!
//! Key characteristics of the API:
//! - `GET /v2/parada/{stop}/{line}` returns today's schedule plus
//!   real-time estimates; adding `/{YYYYMMDD}` returns only the schedule
//!   for that date
//! - Scalars are loosely typed (numbers may arrive as strings)
//! - Night trips are listed under the previous service day

mod client;
mod convert;
mod error;
mod lenient;
mod mock;
mod types;

pub use client::{FeedClient, FeedClientConfig};
pub use convert::{ConversionError, convert_bus_position, convert_stop_response};
pub use error::FeedError;
pub use mock::MockFeedClient;
pub use types::{BusPositionDto, LineDto, RealTimeDto, ScheduledDto, StopResponse};

use crate::domain::{LineId, ServiceDay, StopId};

/// One stop feed request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedQuery {
    pub stop: StopId,
    pub line: LineId,
    pub day: ServiceDay,
}

impl FeedQuery {
    pub fn new(stop: StopId, line: LineId, day: ServiceDay) -> Self {
        Self { stop, line, day }
    }
}
