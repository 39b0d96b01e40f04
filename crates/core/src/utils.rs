use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Parses a raw timestamp string as a UTC instant
/// Supports various formats: ISO 8601, SQLite datetime, etc.
pub fn parse_utc_timestamp(timestamp_str: &str) -> Option<DateTime<Utc>> {
    let timestamp_str = timestamp_str.trim();
    if timestamp_str.is_empty() {
        return None;
    }

    // ISO 8601 with offset (e.g., "2025-12-16T10:30:00Z" or "2025-12-16T10:30:00.123+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp_str) {
        return Some(dt.with_timezone(&Utc));
    }

    // ISO 8601 and SQLite datetime without offset, assumed UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(timestamp_str, format) {
            return Some(naive_dt.and_utc());
        }
    }

    // Date only - treat as midnight UTC
    NaiveDate::parse_from_str(timestamp_str, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive_dt| naive_dt.and_utc())
}

/// Formats a UTC instant as a `YYYY-MM-DD` date in the given zone
pub fn local_date(instant: &DateTime<Utc>, zone: &Tz) -> String {
    instant.with_timezone(zone).format("%Y-%m-%d").to_string()
}

/// Formats a UTC instant as an `HH:MM` clock time in the given zone
pub fn local_time(instant: &DateTime<Utc>, zone: &Tz) -> String {
    instant.with_timezone(zone).format("%H:%M").to_string()
}

/// Sanitizes a string for use in a filename
/// Replaces invalid filename characters with hyphens
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '!' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
