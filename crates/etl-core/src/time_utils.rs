use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::table::Value;

// ── Date parsing ──────────────────────────────────────────────────────────────

/// Date-time patterns tried after RFC 3339, in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m-%d-%Y %H:%M:%S",
];

/// Date-only patterns. Slash and dash forms with a leading day/month are
/// read month-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%Y%m%d"];

/// Parse a string into a calendar date.
///
/// Handles:
/// * RFC 3339 (including `Z`-suffix); the date is taken in the stated offset.
/// * ISO-like date-times with `T` or space separators.
/// * Date-only forms: `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, `MM-DD-YYYY`,
///   `YYYYMMDD`.
///
/// Returns `None` for empty strings or unrecognised formats.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let normalised = if let Some(stripped) = s.strip_suffix('Z') {
        format!("{}+00:00", stripped)
    } else {
        s.to_string()
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Interpret a cell value as a calendar date.
///
/// Date and timestamp values convert directly, strings go through
/// [`parse_date_str`]. Numbers and booleans are never dates.
pub fn value_to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(ts) => Some(ts.date()),
        Value::Str(s) => parse_date_str(s),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => None,
    }
}

/// Calendar month (1–12) of a date-like value.
pub fn month_of(value: &Value) -> Option<u32> {
    value_to_date(value).map(|d| d.month())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
