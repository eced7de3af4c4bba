use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

const STORE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const LABEL_FORMAT: &str = "%Y%m%d-%H%M%S";

/// A UTC instant at second precision, in the store's text format.
///
/// The fixed-width format means string order equals time order, which the
/// staleness comparison in SQL relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncate to whole seconds so the value survives a text round-trip.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp();
        Self(DateTime::from_timestamp(secs, 0).unwrap_or(dt))
    }

    /// Parse the store format, e.g. `2025-01-31T08:00:00Z`.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s, STORE_FORMAT)
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }

    pub fn to_store(&self) -> String {
        self.0.format(STORE_FORMAT).to_string()
    }

    /// Compact form used to name exports, e.g. `20250131-080000`.
    pub fn label(&self) -> String {
        self.0.format(LABEL_FORMAT).to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_store())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_store())
    }
}
