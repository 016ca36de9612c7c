//! Periodic refresh of every tracked pair.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use futures::future::join_all;
use tracing::{debug, info};

use crate::domain::{LineId, StopId};
use crate::resolver::{ArrivalResolver, FeedProvider};

use super::board::{BoardEntry, TrackedBoard};

/// Default refresh interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Time from `now` until the next multiple of `interval` since midnight.
///
/// A time exactly on a boundary waits a whole interval. A zero interval
/// never waits.
pub fn delay_until_next_tick(now: NaiveDateTime, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis();
    if interval_ms == 0 {
        return Duration::ZERO;
    }

    let time = now.time();
    let since_midnight_ms = u128::from(time.num_seconds_from_midnight()) * 1000
        + u128::from(time.nanosecond() / 1_000_000);

    let remaining = interval_ms - since_midnight_ms % interval_ms;
    Duration::from_millis(u64::try_from(remaining).unwrap_or(u64::MAX))
}

/// Refreshes tracked pairs on interval boundaries of the resolver's clock.
pub struct PollScheduler<P> {
    resolver: Arc<ArrivalResolver<P>>,
    board: TrackedBoard,
    interval: Duration,
}

impl<P: FeedProvider> PollScheduler<P> {
    pub fn new(resolver: Arc<ArrivalResolver<P>>, board: TrackedBoard) -> Self {
        Self {
            resolver,
            board,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Resolve one pair and store the result on the board.
    ///
    /// Returns whether the result was applied.
    pub async fn refresh_one(&self, stop: &StopId, line: &LineId) -> bool {
        let token = self.board.begin_update();
        let count = self.resolver.config().default_upcoming;

        let board = self.resolver.resolve_board(stop, line, count).await;
        let (nearest, upcoming) = match board {
            Some(board) => (Some(board.nearest), board.upcoming),
            None => (None, Vec::new()),
        };

        let entry = BoardEntry {
            nearest,
            upcoming,
            updated_at: self.resolver.clock().now(),
            token,
        };
        self.board.apply(stop, line, entry).await
    }

    /// Refresh every tracked pair concurrently.
    ///
    /// Returns the number of results applied.
    pub async fn refresh_all(&self) -> usize {
        let pairs = self.board.pairs().await;
        if pairs.is_empty() {
            return 0;
        }

        let results = join_all(
            pairs
                .iter()
                .map(|(stop, line)| self.refresh_one(stop, line)),
        )
        .await;

        let applied = results.into_iter().filter(|applied| *applied).count();
        info!(tracked = pairs.len(), applied, "refreshed tracked lines");
        applied
    }

    /// Refresh forever, once per interval boundary.
    pub async fn run(&self) {
        loop {
            let delay = delay_until_next_tick(self.resolver.clock().now(), self.interval);
            debug!(delay_ms = delay.as_millis() as u64, "waiting for next poll");
            tokio::time::sleep(delay).await;

            self.refresh_all().await;
        }
    }
}
