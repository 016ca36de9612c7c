//! HTTP route handlers.

use std::path::Path as FsPath;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::domain::{InvalidId, LineId, StopId, TripId};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
///
/// `static_dir` is the path to the front-end's static assets.
pub fn create_router(state: AppState, static_dir: &FsPath) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stops/:stop/lines/:line/nearest", get(nearest_arrival))
        .route("/api/stops/:stop/lines/:line/upcoming", get(upcoming_arrivals))
        .route("/api/vehicles/:trip/position", get(vehicle_position))
        .route("/api/tracked", get(list_tracked).post(track_line))
        .route("/api/tracked/:stop/:line", delete(untrack_line))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn parse_pair(stop: &str, line: &str) -> Result<(StopId, LineId), AppError> {
    Ok((StopId::parse(stop)?, LineId::parse(line)?))
}

/// Next arrival at a stop for a line, or `null` when there is no service.
async fn nearest_arrival(
    State(state): State<AppState>,
    Path((stop, line)): Path<(String, String)>,
) -> Result<Json<Option<ArrivalView>>, AppError> {
    let (stop, line) = parse_pair(&stop, &line)?;

    let nearest = state.resolver.resolve_nearest_arrival(&stop, &line).await;
    let now = state.resolver.clock().now();

    Ok(Json(nearest.map(|n| ArrivalView::from_nearest(&n, now))))
}

/// Arrivals following the nearest one.
async fn upcoming_arrivals(
    State(state): State<AppState>,
    Path((stop, line)): Path<(String, String)>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<ArrivalView>>, AppError> {
    let (stop, line) = parse_pair(&stop, &line)?;
    let count = state.resolver.config().upcoming_count(query.count);

    let upcoming = state
        .resolver
        .resolve_upcoming_arrivals(&stop, &line, count)
        .await;
    let now = state.resolver.clock().now();

    Ok(Json(
        upcoming
            .iter()
            .map(|t| ArrivalView::from_trip(t, now))
            .collect(),
    ))
}

/// Last known position of the vehicle running a trip.
async fn vehicle_position(
    State(state): State<AppState>,
    Path(trip): Path<String>,
) -> Result<Json<PositionResponse>, AppError> {
    let trip = TripId::parse(&trip)?;

    let position = state
        .resolver
        .locate_vehicle(&trip)
        .await
        .ok_or_else(|| AppError::NotFound {
            message: format!("No position for trip {}", trip),
        })?;

    Ok(Json(PositionResponse::new(trip.to_string(), &position)))
}

/// All tracked lines with their latest arrivals.
async fn list_tracked(State(state): State<AppState>) -> Json<TrackedResponse> {
    let now = state.resolver.clock().now();
    let tracked = state
        .board
        .snapshot()
        .await
        .iter()
        .map(|t| TrackedView::from_tracked(t, now))
        .collect();

    Json(TrackedResponse { tracked })
}

/// Start tracking a line. The first refresh runs before responding.
async fn track_line(
    State(state): State<AppState>,
    Json(req): Json<TrackRequest>,
) -> Result<Response, AppError> {
    let (stop, line) = parse_pair(&req.stop, &req.line)?;

    let added = state.board.track(stop.clone(), line.clone()).await;
    if added {
        info!(%stop, %line, "tracking line");
        state.scheduler.refresh_one(&stop, &line).await;
    }

    let now = state.resolver.clock().now();
    let tracked = state
        .board
        .snapshot()
        .await
        .into_iter()
        .find(|t| t.stop == stop && t.line == line)
        .ok_or_else(|| AppError::NotFound {
            message: format!("Line {} at stop {} was untracked", line, stop),
        })?;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(TrackedView::from_tracked(&tracked, now))).into_response())
}

/// Stop tracking a line.
async fn untrack_line(
    State(state): State<AppState>,
    Path((stop, line)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let (stop, line) = parse_pair(&stop, &line)?;

    if state.board.untrack(&stop, &line).await {
        info!(%stop, %line, "stopped tracking line");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound {
            message: format!("Line {} at stop {} is not tracked", line, stop),
        })
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
}

impl From<InvalidId> for AppError {
    fn from(e: InvalidId) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, "{message}");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
