//! Time related utils.

use crate::{Error, Result};
use chrono::Utc;

/// The instant type used across all signers.
pub type DateTime = chrono::DateTime<Utc>;

/// Take the current time.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a datetime as the SigV4 scope date: "20220313".
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format a datetime as compact ISO 8601: "20220313T072004Z".
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse a RFC 3339 timestamp like "2022-03-13T07:20:04Z".
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            Error::unexpected("failed to parse rfc3339 timestamp")
                .with_source(e)
                .with_context(format!("input: {s}"))
        })
}
