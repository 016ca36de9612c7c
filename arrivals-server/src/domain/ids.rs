//! Identifier types for stops, lines and trips.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest stop or line code we accept.
const MAX_CODE_LEN: usize = 16;

/// Error returned when parsing an invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

impl InvalidId {
    fn new(kind: &'static str, reason: &'static str) -> Self {
        Self { kind, reason }
    }
}

/// Validate a stop or line code.
///
/// Codes end up as URL path segments, so only ASCII letters and digits
/// are allowed.
fn validate_code(s: &str, kind: &'static str) -> Result<String, InvalidId> {
    let s = s.trim();

    if s.is_empty() {
        return Err(InvalidId::new(kind, "must not be empty"));
    }

    if s.len() > MAX_CODE_LEN {
        return Err(InvalidId::new(kind, "must be at most 16 characters"));
    }

    if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(InvalidId::new(kind, "must be ASCII letters or digits"));
    }

    Ok(s.to_string())
}

/// A bus stop code, e.g. `813`.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::StopId;
///
/// let stop = StopId::parse("813").unwrap();
/// assert_eq!(stop.as_str(), "813");
///
/// assert!(StopId::parse("").is_err());
/// assert!(StopId::parse("81/3").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopId(String);

impl StopId {
    /// Parse a stop code. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        validate_code(s, "stop id").map(Self)
    }

    /// Returns the stop code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A line code, e.g. `1` or `C2`.
///
/// Line codes are case-sensitive: the API distinguishes them verbatim.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LineId(String);

impl LineId {
    /// Parse a line code. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        validate_code(s, "line id").map(Self)
    }

    /// Returns the line code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A trip identifier, unique within a service day for a given line.
///
/// Trip ids are opaque; the only requirement is that they are non-empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TripId(String);

impl TripId {
    /// Parse a trip id. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InvalidId::new("trip id", "must not be empty"));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the trip id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_id_traits {
    ($ty:ident) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = InvalidId;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> Self {
                id.0
            }
        }
    };
}

impl_id_traits!(StopId);
impl_id_traits!(LineId);
impl_id_traits!(TripId);
