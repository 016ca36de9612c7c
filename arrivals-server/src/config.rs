//! Application configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::feed::FeedClientConfig;
use crate::tracking::DEFAULT_POLL_INTERVAL;

const DEFAULT_STATIC_DIR: &str = "static";

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be set (or set BUS_MOCK_DATA_DIR to run on sample data)")]
    Missing { name: &'static str },

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Where arrival data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// The live transit API.
    Api { base_url: String, timeout_secs: u64 },
    /// JSON sample files in a directory.
    Mock { data_dir: PathBuf },
}

impl DataSource {
    /// Client configuration for the live API, if that is the source.
    pub fn feed_client_config(&self) -> Option<FeedClientConfig> {
        match self {
            DataSource::Api {
                base_url,
                timeout_secs,
            } => Some(FeedClientConfig::new(base_url.clone()).with_timeout(*timeout_secs)),
            DataSource::Mock { .. } => None,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: DataSource,
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub poll_interval: Duration,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// - `BUS_API_BASE_URL`: transit API root (required unless mocking)
    /// - `BUS_API_TIMEOUT_SECS`: request timeout, default 15
    /// - `BUS_MOCK_DATA_DIR`: serve sample data from this directory instead
    /// - `BUS_BIND_ADDR`: listen address, default `127.0.0.1:3000`
    /// - `BUS_STATIC_DIR`: static assets, default `static`
    /// - `BUS_POLL_INTERVAL_SECS`: tracked line refresh, default 30
    /// - `BUS_LIVE_TTL_SECS` / `BUS_SCHEDULED_TTL_SECS`: cache lifetimes
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let source = match var("BUS_MOCK_DATA_DIR") {
            Some(dir) => DataSource::Mock {
                data_dir: PathBuf::from(dir),
            },
            None => DataSource::Api {
                base_url: var("BUS_API_BASE_URL").ok_or(ConfigError::Missing {
                    name: "BUS_API_BASE_URL",
                })?,
                timeout_secs: parse_or("BUS_API_TIMEOUT_SECS", var("BUS_API_TIMEOUT_SECS"), 15)?,
            },
        };

        let bind_addr = parse_or(
            "BUS_BIND_ADDR",
            var("BUS_BIND_ADDR"),
            SocketAddr::from(([127, 0, 0, 1], 3000)),
        )?;

        let static_dir = PathBuf::from(
            var("BUS_STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        );

        let poll_interval = Duration::from_secs(parse_or(
            "BUS_POLL_INTERVAL_SECS",
            var("BUS_POLL_INTERVAL_SECS"),
            DEFAULT_POLL_INTERVAL.as_secs(),
        )?);
        if poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "BUS_POLL_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "interval must be at least one second".to_string(),
            });
        }

        let defaults = CacheConfig::default();
        let cache = defaults
            .clone()
            .with_live_ttl(Duration::from_secs(parse_or(
                "BUS_LIVE_TTL_SECS",
                var("BUS_LIVE_TTL_SECS"),
                defaults.live_ttl.as_secs(),
            )?))
            .with_scheduled_ttl(Duration::from_secs(parse_or(
                "BUS_SCHEDULED_TTL_SECS",
                var("BUS_SCHEDULED_TTL_SECS"),
                defaults.scheduled_ttl.as_secs(),
            )?));

        Ok(Self {
            source,
            bind_addr,
            static_dir,
            poll_interval,
            cache,
        })
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
