//! The set of tracked stop/line pairs and their latest arrivals.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{LineId, MergedTrip, NearestTrip, StopId};

/// Identifies one refresh. Later refreshes carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UpdateToken(u64);

impl UpdateToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues increasing update tokens.
#[derive(Debug, Default)]
pub struct UpdateSequencer {
    last: AtomicU64,
}

impl UpdateSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token newer than every token issued before it.
    pub fn issue(&self) -> UpdateToken {
        UpdateToken(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Latest resolution for one tracked pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardEntry {
    pub nearest: Option<NearestTrip>,
    pub upcoming: Vec<MergedTrip>,
    pub updated_at: NaiveDateTime,
    pub token: UpdateToken,
}

/// A tracked pair and its latest entry, if it has been refreshed yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedLine {
    pub stop: StopId,
    pub line: LineId,
    pub entry: Option<BoardEntry>,
}

type PairKey = (StopId, LineId);

/// Thread-safe board of tracked stop/line pairs.
///
/// Clones share the same board. Refresh results are applied only when
/// their token is newer than the stored entry's, so a slow refresh never
/// overwrites a faster, later one.
#[derive(Clone, Default)]
pub struct TrackedBoard {
    inner: Arc<RwLock<BTreeMap<PairKey, Option<BoardEntry>>>>,
    sequencer: Arc<UpdateSequencer>,
}

impl TrackedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a pair. Returns `false` if it was already tracked.
    pub async fn track(&self, stop: StopId, line: LineId) -> bool {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&(stop.clone(), line.clone())) {
            return false;
        }
        guard.insert((stop, line), None);
        true
    }

    /// Stop tracking a pair. Returns `false` if it was not tracked.
    pub async fn untrack(&self, stop: &StopId, line: &LineId) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(&(stop.clone(), line.clone())).is_some()
    }

    pub async fn is_tracked(&self, stop: &StopId, line: &LineId) -> bool {
        let guard = self.inner.read().await;
        guard.contains_key(&(stop.clone(), line.clone()))
    }

    /// All tracked pairs, ordered by stop then line.
    pub async fn pairs(&self) -> Vec<(StopId, LineId)> {
        let guard = self.inner.read().await;
        guard.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Issue the token for a refresh about to start.
    pub fn begin_update(&self) -> UpdateToken {
        self.sequencer.issue()
    }

    /// Store a refresh result.
    ///
    /// Returns `false` without changing anything when the pair is no
    /// longer tracked or a newer result is already stored.
    pub async fn apply(&self, stop: &StopId, line: &LineId, entry: BoardEntry) -> bool {
        let mut guard = self.inner.write().await;
        let Some(slot) = guard.get_mut(&(stop.clone(), line.clone())) else {
            debug!(%stop, %line, "dropping update for untracked line");
            return false;
        };

        if let Some(current) = slot.as_ref().filter(|c| c.token >= entry.token) {
            debug!(
                %stop,
                %line,
                stale = entry.token.value(),
                current = current.token.value(),
                "dropping stale update"
            );
            return false;
        }

        *slot = Some(entry);
        true
    }

    /// Latest entry for a pair.
    pub async fn entry(&self, stop: &StopId, line: &LineId) -> Option<BoardEntry> {
        let guard = self.inner.read().await;
        guard.get(&(stop.clone(), line.clone())).cloned().flatten()
    }

    /// Every tracked pair with its latest entry.
    pub async fn snapshot(&self) -> Vec<TrackedLine> {
        let guard = self.inner.read().await;
        guard
            .iter()
            .map(|((stop, line), entry)| TrackedLine {
                stop: stop.clone(),
                line: line.clone(),
                entry: entry.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trip::fixtures::*;

    fn stop() -> StopId {
        StopId::parse("813").unwrap()
    }

    fn line() -> LineId {
        LineId::parse("1").unwrap()
    }

    fn entry(token: UpdateToken, updated_at: NaiveDateTime) -> BoardEntry {
        BoardEntry {
            nearest: None,
            upcoming: vec![],
            updated_at,
            token,
        }
    }

    #[test]
    fn tokens_increase() {
        let sequencer = UpdateSequencer::new();
        let a = sequencer.issue();
        let b = sequencer.issue();
        assert!(b > a);
        assert_eq!(a.value(), 1);
    }

    #[tokio::test]
    async fn track_and_untrack() {
        let board = TrackedBoard::new();

        assert!(board.track(stop(), line()).await);
        assert!(!board.track(stop(), line()).await);
        assert!(board.is_tracked(&stop(), &line()).await);
        assert_eq!(board.pairs().await, vec![(stop(), line())]);

        assert!(board.untrack(&stop(), &line()).await);
        assert!(!board.untrack(&stop(), &line()).await);
        assert!(board.is_empty().await);
    }

    #[tokio::test]
    async fn newer_update_wins_over_slower_older_one() {
        let board = TrackedBoard::new();
        board.track(stop(), line()).await;

        let older = board.begin_update();
        let newer = board.begin_update();

        // The newer refresh completes first
        assert!(board.apply(&stop(), &line(), entry(newer, at(8, 1))).await);
        assert!(!board.apply(&stop(), &line(), entry(older, at(8, 0))).await);

        let stored = board.entry(&stop(), &line()).await.unwrap();
        assert_eq!(stored.token, newer);
        assert_eq!(stored.updated_at, at(8, 1));
    }

    #[tokio::test]
    async fn same_token_is_not_applied_twice() {
        let board = TrackedBoard::new();
        board.track(stop(), line()).await;

        let token = board.begin_update();
        assert!(board.apply(&stop(), &line(), entry(token, at(8, 0))).await);
        assert!(!board.apply(&stop(), &line(), entry(token, at(8, 5))).await);
    }

    #[tokio::test]
    async fn update_for_untracked_pair_is_dropped() {
        let board = TrackedBoard::new();
        let token = board.begin_update();

        assert!(!board.apply(&stop(), &line(), entry(token, at(8, 0))).await);
        assert!(board.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_lists_pending_pairs() {
        let board = TrackedBoard::new();
        board.track(stop(), line()).await;
        board.track(stop(), LineId::parse("2").unwrap()).await;

        let token = board.begin_update();
        board.apply(&stop(), &line(), entry(token, at(8, 0))).await;

        let snapshot = board.clone().snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[0].entry.is_some());
        assert!(snapshot[1].entry.is_none());
    }
}
