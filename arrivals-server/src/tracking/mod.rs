//! Tracked lines and their periodic refresh.
//!
//! The board holds the stop/line pairs a user follows and the latest
//! resolved arrivals for each. The scheduler re-resolves every pair on
//! fixed wall-clock boundaries; each refresh carries an update token so
//! that a slow, older refresh cannot overwrite a newer result.

mod board;
mod scheduler;

pub use board::{BoardEntry, TrackedBoard, TrackedLine, UpdateSequencer, UpdateToken};
pub use scheduler::{DEFAULT_POLL_INTERVAL, PollScheduler, delay_until_next_tick};
