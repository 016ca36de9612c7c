//! Service-day time handling.
//!
//! The transit API reports arrivals either as full timestamps
//! (`fechaHoraLlegada`) or as clock times relative to the service day
//! (`llegada`). Night trips belong to the previous service day, so clock
//! times may run past `24:00` and roll into the next calendar day.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Clock-time hours beyond this are rejected; a service day never spans
/// more than two calendar days.
const MAX_SERVICE_HOUR: u32 = 47;

/// Timestamp layouts the API has been seen to use, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// The day a feed is requested for.
///
/// `Today` feeds are requested without a date so the API includes
/// real-time arrivals; `Date` feeds carry an explicit `YYYYMMDD` segment
/// and only hold the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceDay {
    Today(NaiveDate),
    Date(NaiveDate),
}

impl ServiceDay {
    /// The calendar date clock times in this feed are anchored on.
    pub fn date(&self) -> NaiveDate {
        match self {
            ServiceDay::Today(date) | ServiceDay::Date(date) => *date,
        }
    }

    /// Whether the feed is expected to include real-time data.
    pub fn is_live(&self) -> bool {
        matches!(self, ServiceDay::Today(_))
    }

    /// The optional trailing path segment for the stop endpoint.
    pub fn path_segment(&self) -> Option<String> {
        match self {
            ServiceDay::Today(_) => None,
            ServiceDay::Date(date) => Some(format_yyyymmdd(*date)),
        }
    }
}

impl fmt::Display for ServiceDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceDay::Today(date) => write!(f, "today ({date})"),
            ServiceDay::Date(date) => write!(f, "{date}"),
        }
    }
}

/// Format a date as the API's `YYYYMMDD` path segment.
///
/// ```
/// use arrivals_server::domain::format_yyyymmdd;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
/// assert_eq!(format_yyyymmdd(date), "20240305");
/// ```
pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Whether a wall-clock instant falls in the early-morning window where
/// trips from the previous service day may still be running.
///
/// The window is `[00:00, end_hour:00)`.
pub fn in_midnight_window(at: NaiveDateTime, end_hour: u32) -> bool {
    at.hour() < end_hour
}

/// Parse a service-day clock time (`HH:MM` or `HH:MM:SS`).
///
/// Hours past 23 roll into the following calendar day, so `25:10` on a
/// service day of the 15th is 01:10 on the 16th.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::parse_clock_time;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
///
/// let t = parse_clock_time("08:17", date).unwrap();
/// assert_eq!(t.to_string(), "2024-03-15 08:17:00");
///
/// let t = parse_clock_time("25:10:30", date).unwrap();
/// assert_eq!(t.to_string(), "2024-03-16 01:10:30");
///
/// assert!(parse_clock_time("8.17", date).is_err());
/// assert!(parse_clock_time("08:61", date).is_err());
/// ```
pub fn parse_clock_time(s: &str, service_date: NaiveDate) -> Result<NaiveDateTime, TimeError> {
    let mut parts = s.trim().split(':');

    let hour = parts
        .next()
        .and_then(parse_digits)
        .ok_or_else(|| TimeError::new("invalid hour digits"))?;
    let minute = parts
        .next()
        .and_then(parse_digits)
        .ok_or_else(|| TimeError::new("expected HH:MM or HH:MM:SS"))?;
    let second = match parts.next() {
        Some(p) => parse_digits(p).ok_or_else(|| TimeError::new("invalid second digits"))?,
        None => 0,
    };

    if parts.next().is_some() {
        return Err(TimeError::new("expected HH:MM or HH:MM:SS"));
    }
    if hour > MAX_SERVICE_HOUR {
        return Err(TimeError::new("hour must be 0-47"));
    }
    if minute > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }
    if second > 59 {
        return Err(TimeError::new("second must be 0-59"));
    }

    let offset = Duration::seconds(i64::from(hour * 3600 + minute * 60 + second));
    service_date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.checked_add_signed(offset))
        .ok_or_else(|| TimeError::new("date overflow"))
}

/// Parse a full arrival timestamp.
///
/// RFC 3339 values with an offset are converted to local wall time;
/// offset-free values are taken as local wall time already.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TimeError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| TimeError::new("unrecognised timestamp format"))
}

/// Resolve the arrival instant of a feed record.
///
/// The full timestamp wins when it parses; otherwise the clock time is
/// anchored on the service date.
pub fn resolve_arrival(
    timestamp: Option<&str>,
    clock_time: Option<&str>,
    service_date: NaiveDate,
) -> Result<NaiveDateTime, TimeError> {
    if let Some(parsed) = timestamp.and_then(|ts| parse_timestamp(ts).ok()) {
        return Ok(parsed);
    }

    match clock_time {
        Some(t) => parse_clock_time(t, service_date),
        None => Err(TimeError::new("no arrival time present")),
    }
}

/// Parse a run of one or two ASCII digits.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
