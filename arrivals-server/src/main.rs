use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use arrivals_server::backend::FeedBackend;
use arrivals_server::cache::CachedFeedClient;
use arrivals_server::clock::SystemClock;
use arrivals_server::config::{AppConfig, DataSource};
use arrivals_server::destinations::LineDestinations;
use arrivals_server::feed::{FeedClient, FeedError, MockFeedClient};
use arrivals_server::resolver::{ArrivalResolver, ResolverConfig};
use arrivals_server::tracking::{PollScheduler, TrackedBoard};
use arrivals_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let board = TrackedBoard::new();

    let backend = match build_backend(&config, &board).await {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "failed to create feed backend");
            return ExitCode::FAILURE;
        }
    };
    if backend.is_mock() {
        info!("serving sample data, not the live API");
    }

    let resolver = Arc::new(ArrivalResolver::new(
        backend,
        Arc::new(SystemClock),
        ResolverConfig::default(),
        LineDestinations::new(),
    ));

    let scheduler = Arc::new(
        PollScheduler::new(resolver.clone(), board.clone()).with_interval(config.poll_interval),
    );

    // Refresh tracked lines on every interval boundary
    let poller = scheduler.clone();
    tokio::spawn(async move {
        poller.refresh_all().await;
        poller.run().await;
    });

    let state = AppState::new(resolver, board, scheduler);
    let app = create_router(state, &config.static_dir);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(addr = %config.bind_addr, "bus arrivals server listening");
    info!("  GET    /health");
    info!("  GET    /api/stops/:stop/lines/:line/nearest");
    info!("  GET    /api/stops/:stop/lines/:line/upcoming?count=N");
    info!("  GET    /api/vehicles/:trip/position");
    info!("  GET    /api/tracked");
    info!("  POST   /api/tracked");
    info!("  DELETE /api/tracked/:stop/:line");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build the feed backend. In mock mode every sample stop/line pair is
/// tracked from the start.
async fn build_backend(config: &AppConfig, board: &TrackedBoard) -> Result<FeedBackend, FeedError> {
    match &config.source {
        DataSource::Api { .. } => {
            let client_config = config
                .source
                .feed_client_config()
                .ok_or_else(|| FeedError::Source("no API configuration".to_string()))?;
            let client = FeedClient::new(client_config)?;
            Ok(FeedBackend::Live(CachedFeedClient::new(client, &config.cache)))
        }
        DataSource::Mock { data_dir } => {
            let mock = MockFeedClient::new(data_dir)?;

            let lines = mock.available_lines().await;
            info!(lines = lines.len(), dir = %data_dir.display(), "loaded sample data");
            for (stop, line) in lines {
                board.track(stop, line).await;
            }

            Ok(FeedBackend::Mock(mock))
        }
    }
}
