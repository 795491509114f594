//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table; public functions are re-exported here.

mod appointment;
mod audit;
mod user;

use chrono::{DateTime, SecondsFormat, Utc};

use super::DatabaseError;

pub use appointment::*;
pub use audit::*;
pub use user::*;

/// Current time at the millisecond precision timestamps are stored with.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Stored form of a timestamp: RFC 3339, UTC, milliseconds. Sorts lexically.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("timestamp {raw}: {e}")))
}

pub(crate) fn parse_optional_timestamp(
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    raw.as_deref().map(parse_timestamp).transpose()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<uuid::Uuid, DatabaseError> {
    uuid::Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
