//! Pickup Timestamp Parsing

use chrono::{DateTime, NaiveDateTime};

/// Accepted layouts after the `T` separator is normalised to a space
const LAYOUTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Longest slice of the caller's input echoed back in an error
const ECHO_LIMIT: usize = 64;

/// Parse a pickup timestamp into wall-clock time.
///
/// RFC 3339 input with an offset keeps the wall-clock time at that offset.
/// Date-only strings and strings without a date/time separator are rejected.
pub fn parse_pickup_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }

    let normalized = trimmed.replacen('T', " ", 1);
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(&normalized, layout).ok())
        .ok_or_else(|| {
            let echo: String = trimmed.chars().take(ECHO_LIMIT).collect();
            format!(
                "'{}' is not a date/time in YYYY-MM-DD HH:MM:SS format",
                echo
            )
        })
}
