//! Display formatting and input validation helpers shared by the API and
//! the client views.
//!
//! All functions are total: empty or unparseable input yields an empty
//! string (formatters) or `false` (validators). Dates are rendered in UTC.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM[:SS]` and bare `YYYY-MM-DD`.
fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// "Wed, Dec 25, 2024"
pub fn format_date(raw: &str) -> String {
    parse_instant(raw)
        .map(|dt| dt.format("%a, %b %-d, %Y").to_string())
        .unwrap_or_default()
}

/// "02:30 PM" from "14:30". Hours must be 0-23 and minutes 0-59.
pub fn format_time(raw: &str) -> String {
    let mut parts = raw.trim().split(':');
    let hours = parts.next().and_then(|h| h.trim().parse::<u32>().ok());
    let minutes = parts.next().and_then(|m| m.trim().parse::<u32>().ok());

    match (hours, minutes) {
        (Some(h), Some(m)) => NaiveTime::from_hms_opt(h, m, 0)
            .map(|t| t.format("%I:%M %p").to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// "Wed, Dec 25, 2024, 02:30 PM"
pub fn format_date_time(raw: &str) -> String {
    parse_instant(raw)
        .map(|dt| dt.format("%a, %b %-d, %Y, %I:%M %p").to_string())
        .unwrap_or_default()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Exactly ten digits once punctuation and spaces are stripped.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.chars().filter(char::is_ascii_digit).count() == 10
}
