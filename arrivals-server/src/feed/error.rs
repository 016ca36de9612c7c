//! Feed client error types.

/// Errors from the transit API client.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed. `body` holds the start of the payload
    /// for debugging.
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Stop, line or trip unknown to the API
    #[error("not found")]
    NotFound,

    /// Rate limited by the API
    #[error("rate limited by transit API")]
    RateLimited,

    /// Base URL cannot be extended with path segments
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Local data source could not be read
    #[error("data source error: {0}")]
    Source(String),
}
