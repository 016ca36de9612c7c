//! Mock feed client for development without API access.
//!
//! Loads sample responses from JSON files and serves them as if they were
//! live API responses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::{LineId, ServiceDay, StopFeed, StopId, TripId, VehiclePosition};
use crate::resolver::FeedProvider;

use super::FeedQuery;
use super::convert::{convert_bus_position, convert_stop_response};
use super::error::FeedError;
use super::types::{BusPositionDto, StopResponse};

/// Key for a stored stop response. `None` date means the undated (today)
/// response.
type ResponseKey = (StopId, LineId, Option<NaiveDate>);

#[derive(Default)]
struct MockData {
    stops: HashMap<ResponseKey, StopResponse>,
    positions: HashMap<TripId, Vec<BusPositionDto>>,
}

/// Mock feed client that serves data from JSON files.
///
/// File names select what each file answers:
/// - `{stop}_{line}.json`: today's feed
/// - `{stop}_{line}_{YYYYMMDD}.json`: the feed for a given date
/// - `position_{trip}.json`: vehicle position for a trip
#[derive(Clone, Default)]
pub struct MockFeedClient {
    data: Arc<RwLock<MockData>>,
}

impl MockFeedClient {
    /// Create an empty mock client.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a new mock client by loading JSON files from a directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, FeedError> {
        let data = load_dir(data_dir.as_ref())?;
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// Register a stop response. `date` of `None` answers today's queries.
    pub async fn insert_stop_response(
        &self,
        stop: StopId,
        line: LineId,
        date: Option<NaiveDate>,
        response: StopResponse,
    ) {
        let mut data = self.data.write().await;
        data.stops.insert((stop, line, date), response);
    }

    /// Register a vehicle position response for a trip.
    pub async fn insert_position(&self, trip: TripId, positions: Vec<BusPositionDto>) {
        let mut data = self.data.write().await;
        data.positions.insert(trip, positions);
    }

    /// List the stop/line pairs with at least one response.
    pub async fn available_lines(&self) -> Vec<(StopId, LineId)> {
        let data = self.data.read().await;
        let mut pairs: Vec<(StopId, LineId)> = data
            .stops
            .keys()
            .map(|(stop, line, _)| (stop.clone(), line.clone()))
            .collect();
        pairs.sort();
        pairs.dedup();
        pairs
    }

    /// Reload mock data from disk (useful for development).
    pub async fn reload(&self, data_dir: impl AsRef<Path>) -> Result<(), FeedError> {
        let fresh = load_dir(data_dir.as_ref())?;
        let mut data = self.data.write().await;
        *data = fresh;
        Ok(())
    }

    /// Serve a stop feed. Mimics `FeedClient::get_stop_feed`.
    pub async fn get_stop_feed(&self, query: &FeedQuery) -> Result<StopFeed, FeedError> {
        let date = match query.day {
            ServiceDay::Today(_) => None,
            ServiceDay::Date(d) => Some(d),
        };
        let key = (query.stop.clone(), query.line.clone(), date);

        let data = self.data.read().await;
        let response = data.stops.get(&key).ok_or(FeedError::NotFound)?;
        Ok(convert_stop_response(response, query.day.date()))
    }

    /// Serve a vehicle position. Mimics `FeedClient::get_bus_position`.
    pub async fn get_bus_position(
        &self,
        trip: &TripId,
    ) -> Result<Option<VehiclePosition>, FeedError> {
        let data = self.data.read().await;
        Ok(data
            .positions
            .get(trip)
            .and_then(|p| convert_bus_position(p)))
    }
}

impl FeedProvider for MockFeedClient {
    async fn stop_feed(&self, query: &FeedQuery) -> Result<StopFeed, FeedError> {
        self.get_stop_feed(query).await
    }

    async fn bus_position(&self, trip: &TripId) -> Result<Option<VehiclePosition>, FeedError> {
        self.get_bus_position(trip).await
    }
}

fn load_dir(data_dir: &Path) -> Result<MockData, FeedError> {
    let mut data = MockData::default();

    let entries = std::fs::read_dir(data_dir).map_err(|e| {
        FeedError::Source(format!("Failed to read mock data directory: {}", e))
    })?;

    for entry in entries {
        let entry = entry
            .map_err(|e| FeedError::Source(format!("Failed to read directory entry: {}", e)))?;

        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| FeedError::Source(format!("Invalid filename: {:?}", path)))?;

        let json = std::fs::read_to_string(&path)
            .map_err(|e| FeedError::Source(format!("Failed to read {:?}: {}", path, e)))?;

        if let Some(trip) = stem.strip_prefix("position_") {
            let trip = TripId::parse(trip)
                .map_err(|e| FeedError::Source(format!("{:?}: {}", path, e)))?;
            let positions: Vec<BusPositionDto> = serde_json::from_str(&json)
                .map_err(|e| FeedError::Source(format!("Failed to parse {:?}: {}", path, e)))?;
            data.positions.insert(trip, positions);
            continue;
        }

        let key = parse_stop_stem(stem)
            .ok_or_else(|| FeedError::Source(format!("Unrecognised mock file name: {:?}", path)))?;
        let response: StopResponse = serde_json::from_str(&json)
            .map_err(|e| FeedError::Source(format!("Failed to parse {:?}: {}", path, e)))?;
        data.stops.insert(key, response);
    }

    if data.stops.is_empty() {
        return Err(FeedError::Source(format!(
            "No mock stop files found in {:?}",
            data_dir
        )));
    }

    Ok(data)
}

/// Parse `{stop}_{line}` or `{stop}_{line}_{YYYYMMDD}`.
fn parse_stop_stem(stem: &str) -> Option<ResponseKey> {
    let mut parts = stem.split('_');
    let stop = StopId::parse(parts.next()?).ok()?;
    let line = LineId::parse(parts.next()?).ok()?;
    let date = match parts.next() {
        Some(d) => Some(NaiveDate::parse_from_str(d, "%Y%m%d").ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((stop, line, date))
}
