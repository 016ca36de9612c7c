//! The feed provider chosen at startup.

use crate::cache::CachedFeedClient;
use crate::domain::{StopFeed, TripId, VehiclePosition};
use crate::feed::{FeedError, FeedQuery, MockFeedClient};
use crate::resolver::FeedProvider;

/// Either the cached live API or sample data.
pub enum FeedBackend {
    Live(CachedFeedClient),
    Mock(MockFeedClient),
}

impl FeedBackend {
    pub fn is_mock(&self) -> bool {
        matches!(self, FeedBackend::Mock(_))
    }
}

impl FeedProvider for FeedBackend {
    async fn stop_feed(&self, query: &FeedQuery) -> Result<StopFeed, FeedError> {
        match self {
            FeedBackend::Live(client) => client.stop_feed(query).await,
            FeedBackend::Mock(client) => client.stop_feed(query).await,
        }
    }

    async fn bus_position(&self, trip: &TripId) -> Result<Option<VehiclePosition>, FeedError> {
        match self {
            FeedBackend::Live(client) => client.bus_position(trip).await,
            FeedBackend::Mock(client) => client.bus_position(trip).await,
        }
    }
}
