//! Timestamps supplied by the SMS forwarder.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parses the forwarder's `time` field into UTC.
///
/// Accepted shapes, tried in order:
/// - `"01.03, 9:15 PM"` (day.month, 12-hour clock) in `tz`, year taken from `now` in `tz`,
///   or the year before when that would put it more than a day in the future
/// - RFC 3339 (`"2025-03-01T18:15:00Z"`, `"...+03:00"`)
/// - ISO 8601 without offset (`"2025-03-01T21:15:00"`), read as `tz` local time
pub fn parse_forwarder_time(raw: &str, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = raw.replace('\u{202F}', " ");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let year = now.with_timezone(&tz).year();
    if let Some(dt) = short_format(s, year, tz) {
        // A message from late December forwarded after New Year belongs to the previous year.
        if dt > now + Duration::days(1) {
            return short_format(s, year - 1, tz).or(Some(dt));
        }
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .and_then(|ndt| tz.from_local_datetime(&ndt).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

fn short_format(s: &str, year: i32, tz: Tz) -> Option<DateTime<Utc>> {
    let ndt = NaiveDateTime::parse_from_str(&format!("{} {}", year, s), "%Y %d.%m, %I:%M %p").ok()?;
    tz.from_local_datetime(&ndt).earliest().map(|dt| dt.with_timezone(&Utc))
}
