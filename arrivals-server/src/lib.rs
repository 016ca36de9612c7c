//! Bus arrivals server.
//!
//! Answers "when is the next bus at this stop, and the ones after it?"
//! by reconciling a transit API's scheduled and real-time feeds, and keeps
//! a board of tracked lines refreshed in the background.

pub mod backend;
pub mod cache;
pub mod clock;
pub mod config;
pub mod destinations;
pub mod domain;
pub mod feed;
pub mod resolver;
pub mod tracking;
pub mod web;
