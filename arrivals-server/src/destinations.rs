//! Line destination lookup.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{LineId, StopFeed, StopId};

/// Thread-safe record of the last destination seen per stop and line.
///
/// Real-time-only trips carry no destination, so the resolver falls back
/// to whatever scheduled records for the same line last reported. One
/// instance lives for the whole session and is shared by clone.
#[derive(Clone, Default)]
pub struct LineDestinations {
    inner: Arc<RwLock<HashMap<(StopId, LineId), String>>>,
}

impl LineDestinations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the destinations found in a feed for `stop`.
    ///
    /// For each line the last scheduled record with a destination wins.
    /// Lines without any destination keep their previous entry.
    pub async fn record(&self, stop: &StopId, feed: &StopFeed) {
        let found: Vec<(LineId, String)> = feed
            .lines
            .iter()
            .filter_map(|line| {
                line.scheduled
                    .iter()
                    .rev()
                    .find_map(|s| s.destination.clone())
                    .map(|d| (line.line.clone(), d))
            })
            .collect();

        if found.is_empty() {
            return;
        }

        let mut guard = self.inner.write().await;
        for (line, destination) in found {
            guard.insert((stop.clone(), line), destination);
        }
    }

    /// Look up the last destination seen for a line at a stop.
    pub async fn lookup(&self, stop: &StopId, line: &LineId) -> Option<String> {
        let guard = self.inner.read().await;
        guard.get(&(stop.clone(), line.clone())).cloned()
    }

    /// Number of recorded stop/line pairs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LineFeed;
    use crate::domain::trip::fixtures::*;

    fn stop() -> StopId {
        StopId::parse("813").unwrap()
    }

    fn line(id: &str) -> LineId {
        LineId::parse(id).unwrap()
    }

    fn feed_with(line_id: &str, destinations: &[Option<&str>]) -> StopFeed {
        let scheduled = destinations
            .iter()
            .enumerate()
            .map(|(i, d)| crate::domain::ScheduledArrival {
                destination: d.map(str::to_string),
                ..scheduled(&format!("T{i}"), at(8, i as u32))
            })
            .collect();

        StopFeed {
            stop_name: None,
            lines: vec![LineFeed {
                line: line(line_id),
                scheduled,
                real_time: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn records_last_destination_per_line() {
        let destinations = LineDestinations::new();
        assert!(destinations.is_empty().await);

        destinations
            .record(&stop(), &feed_with("1", &[Some("Hospital"), Some("Plaza"), None]))
            .await;

        assert_eq!(destinations.len().await, 1);
        assert_eq!(
            destinations.lookup(&stop(), &line("1")).await.as_deref(),
            Some("Plaza")
        );
        assert_eq!(destinations.lookup(&stop(), &line("2")).await, None);
    }

    #[tokio::test]
    async fn feed_without_destinations_keeps_previous() {
        let destinations = LineDestinations::new();
        destinations
            .record(&stop(), &feed_with("1", &[Some("Hospital")]))
            .await;
        destinations.record(&stop(), &feed_with("1", &[None])).await;
        destinations.record(&stop(), &StopFeed::empty()).await;

        assert_eq!(
            destinations.lookup(&stop(), &line("1")).await.as_deref(),
            Some("Hospital")
        );
    }

    #[tokio::test]
    async fn clones_share_state() {
        let destinations = LineDestinations::new();
        let other = destinations.clone();

        other
            .record(&stop(), &feed_with("1", &[Some("Hospital")]))
            .await;

        assert_eq!(destinations.len().await, 1);
    }
}
