//! Timestamp encoding shared by every table.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! microsecond precision, so lexical order in SQL equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}
