//! Web layer for the arrivals server.
//!
//! Provides JSON endpoints for resolving arrivals and managing tracked
//! lines, and serves the front-end's static assets.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
