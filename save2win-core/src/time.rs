//! Time utilities: lenient timestamp parsing into UTC and `Z`-suffixed output.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde_json::Value;

/// Offset-carrying ISO-8601 layouts tried after RFC 3339.
const ISO_OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// ISO-8601 layouts without an offset; read as UTC.
const ISO_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

enum Fallback {
    Date(&'static str),
    DateTime(&'static str),
}

/// Tried in order when strict ISO parsing fails. All read as UTC.
const FALLBACK_FORMATS: &[Fallback] = &[
    Fallback::Date("%Y-%m-%d"),
    Fallback::DateTime("%Y-%m-%dT%H:%M:%SZ"),
    Fallback::DateTime("%Y-%m-%dT%H:%M:%S%.fZ"),
];

/// Parse a raw timestamp value. Anything that is not a non-empty string
/// matching a known layout yields `None`.
pub fn parse_time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value {
        Some(Value::String(s)) => parse_time_str(s),
        _ => None,
    }
}

pub fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    parse_iso(s).or_else(|| parse_fallback(s))
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = match s.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => s.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ISO_OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ISO_NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    None
}

fn parse_fallback(s: &str) -> Option<DateTime<Utc>> {
    FALLBACK_FORMATS.iter().find_map(|f| match f {
        Fallback::Date(fmt) => NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|ndt| ndt.and_utc()),
        Fallback::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|ndt| ndt.and_utc()),
    })
}

/// Format as ISO-8601 with a literal `Z`. Microseconds appear only when
/// the timestamp has a sub-second part.
pub fn to_iso_z(dt: DateTime<Utc>) -> String {
    if dt.nanosecond() / 1_000 == 0 {
        dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}
