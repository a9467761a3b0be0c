//! Creation timestamp parsing.
//!
//! Tag values are written by many producers and not all of them emit strict
//! RFC 3339, so a short ordered list of layouts is tried and the first one
//! that parses wins.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// A textual layout accepted for creation timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// RFC 3339 with `Z` or `±hh:mm`, sub-second precision optional.
    Rfc3339,
    /// `YYYY-MM-DDTHH:MM:SS[.fraction]` followed by the given literal zero
    /// offset (for example `+0000`). The value is read as UTC.
    ZeroOffsetLiteral(&'static str),
}

impl TimestampLayout {
    fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|value| value.with_timezone(&Utc)),
            Self::ZeroOffsetLiteral(suffix) => {
                let local = raw.strip_suffix(suffix)?;
                NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|value| value.and_utc())
            }
        }
    }
}

/// Layouts tried for creation timestamp tags, in order.
pub const ACCEPTED_TIMESTAMP_LAYOUTS: &[TimestampLayout] = &[
    TimestampLayout::Rfc3339,
    TimestampLayout::ZeroOffsetLiteral("+0000"),
    TimestampLayout::ZeroOffsetLiteral("-0000"),
    TimestampLayout::ZeroOffsetLiteral("-00:00"),
    TimestampLayout::ZeroOffsetLiteral("+00:00"),
];

/// Raised when no accepted layout parses a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("timestamp '{raw}' does not match any accepted layout")]
pub struct TimestampParseError {
    /// The rejected input.
    pub raw: String,
}

/// Parses `raw` with the first matching layout from `layouts`.
pub fn resolve_timestamp(
    raw: &str,
    layouts: &[TimestampLayout],
) -> Result<DateTime<Utc>, TimestampParseError> {
    layouts
        .iter()
        .find_map(|layout| layout.parse(raw))
        .ok_or_else(|| TimestampParseError {
            raw: raw.to_owned(),
        })
}

/// Parses a creation timestamp tag value with [`ACCEPTED_TIMESTAMP_LAYOUTS`].
pub fn resolve_creation_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampParseError> {
    resolve_timestamp(raw, ACCEPTED_TIMESTAMP_LAYOUTS)
}
