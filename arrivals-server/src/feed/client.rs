//! Transit API HTTP client.
//!
//! Provides async methods for querying stop arrival feeds and vehicle
//! positions. Handles concurrency limiting, status mapping, and
//! conversion to domain types.

use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{StopFeed, TripId, VehiclePosition};
use crate::resolver::FeedProvider;

use super::FeedQuery;
use super::convert::{convert_bus_position, convert_stop_response};
use super::error::FeedError;
use super::types::{BusPositionDto, StopResponse};

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Longest response body kept in a decode error.
const ERROR_BODY_CHARS: usize = 500;

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Base URL of the transit API, without the `/v2` suffix
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedClientConfig {
    /// Create a new config for the API at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Transit API client.
///
/// Uses a semaphore to limit concurrent requests.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    base_url: Url,
    semaphore: Arc<Semaphore>,
}

impl FeedClient {
    /// Create a new client with the given configuration.
    pub fn new(config: FeedClientConfig) -> Result<Self, FeedError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| FeedError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FeedError::InvalidUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Build the URL for a stop feed query.
    ///
    /// `{base}/v2/parada/{stop}/{line}` for today, with a trailing
    /// `/{YYYYMMDD}` for an explicit date.
    pub fn stop_feed_url(&self, query: &FeedQuery) -> Result<Url, FeedError> {
        let mut segments = vec!["v2", "parada", query.stop.as_str(), query.line.as_str()];
        let date_segment = query.day.path_segment();
        if let Some(date) = &date_segment {
            segments.push(date.as_str());
        }
        self.url_with(&segments)
    }

    /// Build the URL for a vehicle position query.
    pub fn bus_position_url(&self, trip: &TripId) -> Result<Url, FeedError> {
        self.url_with(&["v2", "busPosition", trip.as_str()])
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FeedError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch and validate the arrivals feed for a stop and line.
    pub async fn get_stop_feed(&self, query: &FeedQuery) -> Result<StopFeed, FeedError> {
        let url = self.stop_feed_url(query)?;
        let response: StopResponse = self.get_json(url).await?;
        let feed = convert_stop_response(&response, query.day.date());

        debug!(
            stop = %query.stop,
            line = %query.line,
            day = %query.day,
            records = feed.record_count(),
            "fetched stop feed"
        );

        Ok(feed)
    }

    /// Fetch the last known position of the vehicle running a trip.
    ///
    /// Returns `Ok(None)` when the API has no position for the trip.
    pub async fn get_bus_position(
        &self,
        trip: &TripId,
    ) -> Result<Option<VehiclePosition>, FeedError> {
        let url = self.bus_position_url(trip)?;
        let positions: Vec<BusPositionDto> = match self.get_json(url).await {
            Ok(p) => p,
            Err(FeedError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(convert_bus_position(&positions))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FeedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FeedError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let response = self.http.get(url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| FeedError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(ERROR_BODY_CHARS).collect()),
        })
    }
}

impl FeedProvider for FeedClient {
    async fn stop_feed(&self, query: &FeedQuery) -> Result<StopFeed, FeedError> {
        self.get_stop_feed(query).await
    }

    async fn bus_position(&self, trip: &TripId) -> Result<Option<VehiclePosition>, FeedError> {
        self.get_bus_position(trip).await
    }
}
