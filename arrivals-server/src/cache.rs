//! Caching layer for transit API responses.
//!
//! Today's feed carries real-time estimates and goes stale within
//! seconds; dated feeds are pure schedule and change rarely. They are held
//! in separate caches with their own TTLs. Keys include the service date,
//! so a day change is always a miss.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::{ServiceDay, StopFeed, TripId, VehiclePosition};
use crate::feed::{FeedClient, FeedError, FeedQuery};
use crate::resolver::FeedProvider;

/// Cached stop feed entry.
type FeedEntry = Arc<StopFeed>;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for today's feeds, which include real-time data.
    pub live_ttl: Duration,

    /// TTL for dated, schedule-only feeds.
    pub scheduled_ttl: Duration,

    /// Maximum number of cached entries per cache.
    pub max_capacity: u64,
}

impl CacheConfig {
    pub fn with_live_ttl(mut self, ttl: Duration) -> Self {
        self.live_ttl = ttl;
        self
    }

    pub fn with_scheduled_ttl(mut self, ttl: Duration) -> Self {
        self.scheduled_ttl = ttl;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            live_ttl: Duration::from_secs(30),
            scheduled_ttl: Duration::from_secs(60 * 60),
            max_capacity: 1000,
        }
    }
}

/// Feed provider with caching.
///
/// Wraps another provider and caches successful stop feed responses.
/// Failed fetches are not cached. Vehicle positions always go to the
/// wrapped provider.
pub struct CachedFeedClient<P = FeedClient> {
    inner: P,
    live: MokaCache<FeedQuery, FeedEntry>,
    scheduled: MokaCache<FeedQuery, FeedEntry>,
}

impl<P: FeedProvider> CachedFeedClient<P> {
    /// Create a new cached client.
    pub fn new(inner: P, config: &CacheConfig) -> Self {
        let live = MokaCache::builder()
            .time_to_live(config.live_ttl)
            .max_capacity(config.max_capacity)
            .build();
        let scheduled = MokaCache::builder()
            .time_to_live(config.scheduled_ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            inner,
            live,
            scheduled,
        }
    }

    fn cache_for(&self, day: &ServiceDay) -> &MokaCache<FeedQuery, FeedEntry> {
        if day.is_live() {
            &self.live
        } else {
            &self.scheduled
        }
    }

    /// Get a stop feed, using the cache if available.
    pub async fn get_stop_feed(&self, query: &FeedQuery) -> Result<FeedEntry, FeedError> {
        let cache = self.cache_for(&query.day);

        if let Some(cached) = cache.get(query).await {
            return Ok(cached);
        }

        let entry = Arc::new(self.inner.stop_feed(query).await?);
        debug!(
            stop = %query.stop,
            line = %query.line,
            day = %query.day,
            records = entry.record_count(),
            "caching stop feed"
        );
        cache.insert(query.clone(), entry.clone()).await;

        Ok(entry)
    }

    /// Access the underlying provider for operations that bypass cache.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Get cache statistics (live, scheduled).
    pub fn cache_entry_counts(&self) -> (u64, u64) {
        (self.live.entry_count(), self.scheduled.entry_count())
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.live.invalidate_all();
        self.scheduled.invalidate_all();
    }
}

impl<P: FeedProvider> FeedProvider for CachedFeedClient<P> {
    async fn stop_feed(&self, query: &FeedQuery) -> Result<StopFeed, FeedError> {
        let entry = self.get_stop_feed(query).await?;
        Ok(StopFeed::clone(&entry))
    }

    async fn bus_position(&self, trip: &TripId) -> Result<Option<VehiclePosition>, FeedError> {
        self.inner.bus_position(trip).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineId, StopId};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts fetches and fails on demand.
    #[derive(Default)]
    struct CountingProvider {
        feeds: AtomicUsize,
        positions: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
    }

    impl FeedProvider for CountingProvider {
        async fn stop_feed(&self, _query: &FeedQuery) -> Result<StopFeed, FeedError> {
            self.feeds.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::RateLimited);
            }
            Ok(StopFeed {
                stop_name: Some("Plaza Mayor".to_string()),
                lines: vec![],
            })
        }

        async fn bus_position(&self, _trip: &TripId) -> Result<Option<VehiclePosition>, FeedError> {
            self.positions.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn query(day: ServiceDay) -> FeedQuery {
        FeedQuery::new(
            StopId::parse("813").unwrap(),
            LineId::parse("1").unwrap(),
            day,
        )
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.live_ttl, Duration::from_secs(30));
        assert_eq!(config.scheduled_ttl, Duration::from_secs(3600));
        assert_eq!(config.max_capacity, 1000);
    }

    #[tokio::test]
    async fn repeated_query_is_served_from_cache() {
        let client = CachedFeedClient::new(CountingProvider::default(), &CacheConfig::default());
        let q = query(ServiceDay::Today(date()));

        let first = client.stop_feed(&q).await.unwrap();
        let second = client.stop_feed(&q).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.inner().feeds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn days_are_cached_separately() {
        let client = CachedFeedClient::new(CountingProvider::default(), &CacheConfig::default());

        client.stop_feed(&query(ServiceDay::Today(date()))).await.unwrap();
        client.stop_feed(&query(ServiceDay::Date(date()))).await.unwrap();
        let tomorrow = date().succ_opt().unwrap();
        client.stop_feed(&query(ServiceDay::Today(tomorrow))).await.unwrap();

        assert_eq!(client.inner().feeds.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let client = CachedFeedClient::new(CountingProvider::default(), &CacheConfig::default());
        let q = query(ServiceDay::Today(date()));

        client.inner().fail.store(true, Ordering::SeqCst);
        assert!(client.stop_feed(&q).await.is_err());

        client.inner().fail.store(false, Ordering::SeqCst);
        assert!(client.stop_feed(&q).await.is_ok());
        assert_eq!(client.inner().feeds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn live_entries_expire() {
        let config = CacheConfig::default().with_live_ttl(Duration::from_millis(20));
        let client = CachedFeedClient::new(CountingProvider::default(), &config);
        let q = query(ServiceDay::Today(date()));

        client.stop_feed(&q).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        client.stop_feed(&q).await.unwrap();

        assert_eq!(client.inner().feeds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let client = CachedFeedClient::new(CountingProvider::default(), &CacheConfig::default());
        let q = query(ServiceDay::Date(date()));

        client.stop_feed(&q).await.unwrap();
        client.invalidate_cache();
        client.stop_feed(&q).await.unwrap();

        assert_eq!(client.inner().feeds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn positions_bypass_cache() {
        let client = CachedFeedClient::new(CountingProvider::default(), &CacheConfig::default());
        let trip = TripId::parse("T1").unwrap();

        client.bus_position(&trip).await.unwrap();
        client.bus_position(&trip).await.unwrap();

        assert_eq!(client.inner().positions.load(Ordering::SeqCst), 2);
    }
}
