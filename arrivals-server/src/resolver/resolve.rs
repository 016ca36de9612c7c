//! The arrival resolver service.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::destinations::LineDestinations;
use crate::domain::{
    LineId, LineTrips, MergedTrip, NearestTrip, ServiceDay, StopId, TripId, VehiclePosition,
    in_midnight_window,
};
use crate::feed::FeedQuery;

use super::FeedProvider;
use super::config::ResolverConfig;
use super::merge::{merge_across_days, merge_feed};
use super::nearest::select_nearest;
use super::upcoming::{
    fallback_entries, fallback_service_date, following_nearest, has_later_trips,
};

/// The nearest arrival and the ones after it, resolved from one fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrivalBoard {
    pub nearest: NearestTrip,
    pub upcoming: Vec<MergedTrip>,
}

/// A nearest trip together with the pool it was selected from.
struct Resolution {
    nearest: NearestTrip,
    trips: LineTrips,
    /// Service date the pool was fetched for.
    service_date: NaiveDate,
}

/// Resolves arrivals for a stop and line.
///
/// Feed failures never escape: each one is logged and the affected feed
/// is treated as empty, so callers only ever see "no arrival" or an empty
/// list.
pub struct ArrivalResolver<P> {
    provider: P,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
    destinations: LineDestinations,
}

impl<P: FeedProvider> ArrivalResolver<P> {
    pub fn new(
        provider: P,
        clock: Arc<dyn Clock>,
        config: ResolverConfig,
        destinations: LineDestinations,
    ) -> Self {
        Self {
            provider,
            clock,
            config,
            destinations,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn destinations(&self) -> &LineDestinations {
        &self.destinations
    }

    /// The next arrival at `stop` for `line`, or `None` if there is no
    /// service within the forward search horizon.
    pub async fn resolve_nearest_arrival(
        &self,
        stop: &StopId,
        line: &LineId,
    ) -> Option<NearestTrip> {
        let now = self.clock.now();
        let resolution = self.resolve(stop, line, now).await?;
        Some(resolution.nearest)
    }

    /// Up to `count` arrivals following the nearest one.
    pub async fn resolve_upcoming_arrivals(
        &self,
        stop: &StopId,
        line: &LineId,
        count: usize,
    ) -> Vec<MergedTrip> {
        let now = self.clock.now();
        match self.resolve(stop, line, now).await {
            Some(resolution) => self.upcoming(stop, line, &resolution, count, now).await,
            None => Vec::new(),
        }
    }

    /// The nearest arrival and up to `count` following ones.
    pub async fn resolve_board(
        &self,
        stop: &StopId,
        line: &LineId,
        count: usize,
    ) -> Option<ArrivalBoard> {
        let now = self.clock.now();
        let resolution = self.resolve(stop, line, now).await?;
        let upcoming = self.upcoming(stop, line, &resolution, count, now).await;

        Some(ArrivalBoard {
            nearest: resolution.nearest,
            upcoming,
        })
    }

    /// The last known position of the vehicle running `trip`.
    pub async fn locate_vehicle(&self, trip: &TripId) -> Option<VehiclePosition> {
        match self.provider.bus_position(trip).await {
            Ok(position) => position,
            Err(e) => {
                warn!(trip = %trip, error = %e, "vehicle position lookup failed");
                None
            }
        }
    }

    async fn resolve(&self, stop: &StopId, line: &LineId, now: NaiveDateTime) -> Option<Resolution> {
        let today = now.date();
        let trips = self.todays_trips(stop, line, now).await;

        if let Some(nearest) = select_nearest(&trips, now) {
            return Some(self.resolution(stop, line, nearest, trips, today).await);
        }

        for offset in 1..=self.config.forward_search_days {
            let Some(date) = today.checked_add_days(Days::new(u64::from(offset))) else {
                break;
            };

            let trips = self.fetch_line(stop, line, ServiceDay::Date(date)).await;
            if let Some(nearest) = select_nearest(&trips, now) {
                debug!(%stop, %line, %date, "nearest arrival found by forward search");
                return Some(self.resolution(stop, line, nearest, trips, date).await);
            }
        }

        debug!(
            %stop,
            %line,
            days = self.config.forward_search_days,
            "no arrival within forward search"
        );
        None
    }

    /// Today's trips, merged with yesterday's schedule inside the midnight
    /// window.
    async fn todays_trips(&self, stop: &StopId, line: &LineId, now: NaiveDateTime) -> LineTrips {
        let today = now.date();
        let live = self.fetch_line(stop, line, ServiceDay::Today(today));

        let yesterday = today
            .pred_opt()
            .filter(|_| in_midnight_window(now, self.config.midnight_window_end_hour));

        match yesterday {
            Some(yesterday) => {
                let previous = self.fetch_line(stop, line, ServiceDay::Date(yesterday));
                let (live, previous) = futures::join!(live, previous);
                merge_across_days(&live, &previous)
            }
            None => live.await,
        }
    }

    async fn resolution(
        &self,
        stop: &StopId,
        line: &LineId,
        mut nearest: NearestTrip,
        trips: LineTrips,
        service_date: NaiveDate,
    ) -> Resolution {
        if nearest.destination.is_none() {
            nearest.destination = self.destinations.lookup(stop, line).await;
        }

        Resolution {
            nearest,
            trips,
            service_date,
        }
    }

    async fn upcoming(
        &self,
        stop: &StopId,
        line: &LineId,
        resolution: &Resolution,
        count: usize,
        now: NaiveDateTime,
    ) -> Vec<MergedTrip> {
        let count = count.min(self.config.max_upcoming);
        if count == 0 {
            return Vec::new();
        }

        let Resolution {
            nearest,
            trips,
            service_date,
        } = resolution;

        if has_later_trips(nearest, trips) {
            return following_nearest(nearest, trips, count);
        }

        let date = fallback_service_date(
            nearest,
            *service_date,
            now,
            self.config.midnight_window_end_hour,
        );
        debug!(%stop, %line, %date, "no later arrivals in pool, using fallback day");

        let pool = self.fetch_line(stop, line, ServiceDay::Date(date)).await;
        fallback_entries(&pool, count, self.config.skip_first_fallback_entry)
    }

    /// Fetch and merge one line's trips. A failed fetch yields no trips.
    async fn fetch_line(&self, stop: &StopId, line: &LineId, day: ServiceDay) -> LineTrips {
        let query = FeedQuery::new(stop.clone(), line.clone(), day);

        match self.provider.stop_feed(&query).await {
            Ok(feed) => {
                self.destinations.record(stop, &feed).await;
                merge_feed(&feed).into_line(line)
            }
            Err(e) => {
                warn!(%stop, %line, %day, error = %e, "feed fetch failed, treating as empty");
                LineTrips::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::trip::fixtures::*;
    use crate::domain::{LineFeed, RealTimeArrival, ScheduledArrival, StopFeed};
    use crate::feed::FeedError;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory provider that records every query it answers.
    #[derive(Default)]
    struct ScriptedProvider {
        feeds: HashMap<ServiceDay, StopFeed>,
        failing: Vec<ServiceDay>,
        positions: HashMap<TripId, VehiclePosition>,
        calls: Mutex<Vec<ServiceDay>>,
    }

    impl ScriptedProvider {
        fn with_feed(mut self, day: ServiceDay, feed: StopFeed) -> Self {
            self.feeds.insert(day, feed);
            self
        }

        fn failing_on(mut self, day: ServiceDay) -> Self {
            self.failing.push(day);
            self
        }

        fn calls(&self) -> Vec<ServiceDay> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FeedProvider for ScriptedProvider {
        async fn stop_feed(&self, query: &FeedQuery) -> Result<StopFeed, FeedError> {
            self.calls.lock().unwrap().push(query.day);

            if self.failing.contains(&query.day) {
                return Err(FeedError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(self.feeds.get(&query.day).cloned().unwrap_or_default())
        }

        async fn bus_position(&self, trip: &TripId) -> Result<Option<VehiclePosition>, FeedError> {
            if trip.as_str() == "broken" {
                return Err(FeedError::RateLimited);
            }
            Ok(self.positions.get(trip).cloned())
        }
    }

    fn stop() -> StopId {
        StopId::parse("813").unwrap()
    }

    fn line() -> LineId {
        LineId::parse("1").unwrap()
    }

    fn feed(scheduled: Vec<ScheduledArrival>, real_time: Vec<RealTimeArrival>) -> StopFeed {
        StopFeed {
            stop_name: Some("Plaza Mayor".to_string()),
            lines: vec![LineFeed {
                line: line(),
                scheduled,
                real_time,
            }],
        }
    }

    fn day(offset: u64) -> NaiveDate {
        date().checked_add_days(Days::new(offset)).unwrap()
    }

    /// The stop 813 / line 1 scenario: T1 scheduled 08:10 running at 08:17,
    /// T2 scheduled 08:25 without real-time data, and a next-day schedule.
    fn scenario_provider() -> ScriptedProvider {
        let tomorrow = |h, m| at(h, m) + Duration::days(1);

        ScriptedProvider::default()
            .with_feed(
                ServiceDay::Today(date()),
                feed(
                    vec![scheduled("T1", at(8, 10)), scheduled("T2", at(8, 25))],
                    vec![real_time("T1", at(8, 17))],
                ),
            )
            .with_feed(
                ServiceDay::Date(day(1)),
                feed(
                    vec![
                        scheduled("D1", tomorrow(6, 0)),
                        scheduled("D2", tomorrow(6, 20)),
                        scheduled("D3", tomorrow(6, 40)),
                    ],
                    vec![],
                ),
            )
    }

    fn resolver(
        provider: ScriptedProvider,
        now: NaiveDateTime,
    ) -> (ArrivalResolver<ScriptedProvider>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now));
        let resolver = ArrivalResolver::new(
            provider,
            clock.clone(),
            ResolverConfig::default(),
            LineDestinations::new(),
        );
        (resolver, clock)
    }

    fn ids(trips: &[MergedTrip]) -> Vec<&str> {
        trips.iter().map(|t| t.trip_id().as_str()).collect()
    }

    #[tokio::test]
    async fn scenario_nearest_then_next_after_arrival() {
        let (resolver, clock) = resolver(scenario_provider(), at(8, 5));

        let nearest = resolver.resolve_nearest_arrival(&stop(), &line()).await.unwrap();
        assert_eq!(nearest.trip_id.as_str(), "T1");
        assert_eq!(nearest.effective_arrival, at(8, 17));

        clock.set(at(8, 18));
        let nearest = resolver.resolve_nearest_arrival(&stop(), &line()).await.unwrap();
        assert_eq!(nearest.trip_id.as_str(), "T2");
        assert_eq!(nearest.effective_arrival, at(8, 25));
        assert!(nearest.real_time.is_none());
    }

    #[tokio::test]
    async fn upcoming_follows_nearest_in_todays_pool() {
        let (resolver, _) = resolver(scenario_provider(), at(8, 5));

        let upcoming = resolver.resolve_upcoming_arrivals(&stop(), &line(), 2).await;
        assert_eq!(ids(&upcoming), vec!["T2"]);
    }

    #[tokio::test]
    async fn exhausted_day_falls_back_to_next_schedule_skipping_first() {
        let (resolver, _) = resolver(scenario_provider(), at(8, 18));

        let upcoming = resolver.resolve_upcoming_arrivals(&stop(), &line(), 2).await;
        assert_eq!(ids(&upcoming), vec!["D2", "D3"]);

        assert!(resolver.provider().calls().contains(&ServiceDay::Date(day(1))));
    }

    #[tokio::test]
    async fn fallback_can_keep_first_entry() {
        let clock = Arc::new(FixedClock::new(at(8, 18)));
        let config = ResolverConfig {
            skip_first_fallback_entry: false,
            ..ResolverConfig::default()
        };
        let resolver =
            ArrivalResolver::new(scenario_provider(), clock, config, LineDestinations::new());

        let upcoming = resolver.resolve_upcoming_arrivals(&stop(), &line(), 2).await;
        assert_eq!(ids(&upcoming), vec!["D1", "D2"]);
    }

    #[tokio::test]
    async fn board_resolves_nearest_and_upcoming_together() {
        let (resolver, _) = resolver(scenario_provider(), at(8, 5));

        let board = resolver.resolve_board(&stop(), &line(), 3).await.unwrap();
        assert_eq!(board.nearest.trip_id.as_str(), "T1");
        assert_eq!(ids(&board.upcoming), vec!["T2"]);

        // Today's feed is the only fetch needed
        assert_eq!(resolver.provider().calls(), vec![ServiceDay::Today(date())]);
    }

    #[tokio::test]
    async fn zero_count_returns_nothing_without_fallback_fetch() {
        let (resolver, _) = resolver(scenario_provider(), at(8, 18));

        let upcoming = resolver.resolve_upcoming_arrivals(&stop(), &line(), 0).await;
        assert!(upcoming.is_empty());
        assert_eq!(resolver.provider().calls(), vec![ServiceDay::Today(date())]);
    }

    #[tokio::test]
    async fn midnight_window_merges_yesterdays_schedule() {
        // 00:30 on the 16th: the night trip N1 is scheduled under the 15th
        // at 24:40 and tracked live under the 16th
        let today = day(1);
        let now = at(0, 30) + Duration::days(1);

        let provider = ScriptedProvider::default()
            .with_feed(
                ServiceDay::Today(today),
                feed(vec![], vec![real_time("N1", at(0, 45) + Duration::days(1))]),
            )
            .with_feed(
                ServiceDay::Date(date()),
                feed(vec![scheduled("N1", at(0, 40) + Duration::days(1))], vec![]),
            );
        let (resolver, _) = resolver(provider, now);

        let nearest = resolver.resolve_nearest_arrival(&stop(), &line()).await.unwrap();
        assert_eq!(nearest.trip_id.as_str(), "N1");
        assert_eq!(nearest.effective_arrival, at(0, 45) + Duration::days(1));
        assert!(nearest.scheduled.is_some());
        assert_eq!(nearest.destination.as_deref(), Some("Destination of N1"));

        let calls = resolver.provider().calls();
        assert!(calls.contains(&ServiceDay::Today(today)));
        assert!(calls.contains(&ServiceDay::Date(date())));
    }

    #[tokio::test]
    async fn yesterday_is_not_fetched_outside_midnight_window() {
        let (resolver, _) = resolver(scenario_provider(), at(5, 0));

        resolver.resolve_nearest_arrival(&stop(), &line()).await;
        assert!(
            !resolver
                .provider()
                .calls()
                .contains(&ServiceDay::Date(date().pred_opt().unwrap()))
        );
    }

    #[tokio::test]
    async fn forward_search_finds_first_day_with_service() {
        let provider = ScriptedProvider::default().with_feed(
            ServiceDay::Date(day(3)),
            feed(vec![scheduled("F1", at(7, 0) + Duration::days(3))], vec![]),
        );
        let (resolver, _) = resolver(provider, at(12, 0));

        let nearest = resolver.resolve_nearest_arrival(&stop(), &line()).await.unwrap();
        assert_eq!(nearest.trip_id.as_str(), "F1");

        assert_eq!(
            resolver.provider().calls(),
            vec![
                ServiceDay::Today(date()),
                ServiceDay::Date(day(1)),
                ServiceDay::Date(day(2)),
                ServiceDay::Date(day(3)),
            ]
        );
    }

    #[tokio::test]
    async fn forward_search_is_bounded() {
        let (resolver, _) = resolver(ScriptedProvider::default(), at(12, 0));

        assert!(resolver.resolve_nearest_arrival(&stop(), &line()).await.is_none());
        assert!(resolver.resolve_upcoming_arrivals(&stop(), &line(), 3).await.is_empty());
        assert!(resolver.resolve_board(&stop(), &line(), 3).await.is_none());

        // Today plus ten forward days, for each of the three calls
        assert_eq!(resolver.provider().calls().len(), 3 * 11);
    }

    #[tokio::test]
    async fn failed_fetch_is_treated_as_empty() {
        let provider = scenario_provider().failing_on(ServiceDay::Today(date()));
        let (resolver, _) = resolver(provider, at(8, 5));

        // Today fails, so the first qualifying trip is tomorrow's D1
        let nearest = resolver.resolve_nearest_arrival(&stop(), &line()).await.unwrap();
        assert_eq!(nearest.trip_id.as_str(), "D1");
    }

    #[tokio::test]
    async fn missing_destination_falls_back_to_line_destination() {
        let provider = ScriptedProvider::default().with_feed(
            ServiceDay::Today(date()),
            feed(
                vec![scheduled("T2", at(8, 25))],
                vec![real_time("X1", at(8, 7))],
            ),
        );
        let (resolver, _) = resolver(provider, at(8, 5));

        let nearest = resolver.resolve_nearest_arrival(&stop(), &line()).await.unwrap();
        assert_eq!(nearest.trip_id.as_str(), "X1");
        assert!(nearest.scheduled.is_none());
        assert_eq!(nearest.destination.as_deref(), Some("Destination of T2"));
    }

    #[tokio::test]
    async fn vehicle_lookup_degrades_to_none() {
        let mut provider = ScriptedProvider::default();
        provider.positions.insert(
            trip_id("T1"),
            VehiclePosition {
                latitude: Some(40.96),
                longitude: Some(-5.66),
                speed: None,
                occupancy: None,
                timestamp: None,
            },
        );
        let (resolver, _) = resolver(provider, at(8, 5));

        let position = resolver.locate_vehicle(&trip_id("T1")).await.unwrap();
        assert!(position.has_fix());

        assert!(resolver.locate_vehicle(&trip_id("T9")).await.is_none());
        assert!(resolver.locate_vehicle(&trip_id("broken")).await.is_none());
    }
}
