//! Application state for the web layer.

use std::sync::Arc;

use crate::backend::FeedBackend;
use crate::resolver::ArrivalResolver;
use crate::tracking::{PollScheduler, TrackedBoard};

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Arrival resolver over the configured feed
    pub resolver: Arc<ArrivalResolver<FeedBackend>>,

    /// Tracked stop/line pairs
    pub board: TrackedBoard,

    /// Refresher for tracked pairs, shared with the background poll loop
    pub scheduler: Arc<PollScheduler<FeedBackend>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        resolver: Arc<ArrivalResolver<FeedBackend>>,
        board: TrackedBoard,
        scheduler: Arc<PollScheduler<FeedBackend>>,
    ) -> Self {
        Self {
            resolver,
            board,
            scheduler,
        }
    }
}
