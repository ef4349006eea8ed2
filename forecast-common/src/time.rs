//! Timestamp utilities
//!
//! The backend serialises timestamps as ISO-8601. Timezone-aware values
//! (RFC 3339) are used as-is; naive values are taken to be UTC.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Parse an ISO-8601 timestamp as returned by the forecast backend
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // Naive forms, with and without fractional seconds
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::InvalidInput(format!("Unparseable timestamp: {:?}", value)))
}

/// Format an elapsed duration as `H:MM:SS` (or `M:SS` under an hour)
pub fn format_elapsed(duration: chrono::Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();

    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}{}:{:02}:{:02}", sign, hours, mins, secs)
    } else {
        format!("{}{}:{:02}", sign, mins, secs)
    }
}
