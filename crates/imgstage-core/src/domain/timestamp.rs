//! Timestamp - UTC instant with an explicit "never" value
//!
//! The cleanup cursor starts out as "never cleaned". On the wire that state is
//! the zero time `0001-01-01T00:00:00Z`, and it must decode back into a value
//! for which [`Timestamp::is_zero`] holds, not into an error or year 1.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// RFC3339 rendering of the zero timestamp.
pub const ZERO_RFC3339: &str = "0001-01-01T00:00:00Z";

/// Unix seconds of `0001-01-01T00:00:00Z`.
const ZERO_UNIX_SECONDS: i64 = -62_135_596_800;

/// Timestamp is either zero ("never") or a concrete UTC instant.
///
/// Zero orders before every concrete instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Option<DateTime<Utc>>);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(None);

    pub fn is_zero(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn to_rfc3339(&self) -> String {
        match self.0 {
            None => ZERO_RFC3339.to_string(),
            Some(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    pub fn parse_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        let parsed = DateTime::parse_from_rfc3339(s)?;
        Ok(Self::from(parsed.with_timezone(&Utc)))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        if at.timestamp() == ZERO_UNIX_SECONDS && at.timestamp_subsec_nanos() == 0 {
            Self::ZERO
        } else {
            Self(Some(at))
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse_rfc3339(&raw).map_err(serde::de::Error::custom)
    }
}
