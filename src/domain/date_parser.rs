// Best-effort timestamp parsing for externally sourced rows
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    // US-locale spreadsheet exports, e.g. "1/5/2024 13:07:00"
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%b %d, %Y"];

// YYYY<sep>MM<sep>DD[<sep>]HH:MM[:SS] with sep in {. - /}
static CUSTOM_LAYOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[./-]\s*(\d{1,2})[./-]\s*(\d{1,2})[.-]?\s*(\d{1,2}):(\d{2})(?::(\d{2}))?")
        .expect("regex is valid")
});

/// Parse a date-like cell, falling back to the current instant.
///
/// Malformed timestamps are routine in spreadsheet exports, so this never
/// fails: a row with an unreadable date is kept with an approximate time.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    parse_timestamp_or(raw, Utc::now())
}

pub fn parse_timestamp_or(raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    match try_parse_timestamp(raw) {
        Some(ts) => ts,
        None => {
            if !raw.trim().is_empty() {
                tracing::debug!(raw, "unrecognised timestamp, using fallback instant");
            }
            fallback
        }
    }
}

/// Parse a date-like cell, returning `None` when no known layout matches.
/// Values without an offset are taken as UTC.
pub fn try_parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let clean = raw.replace(['"', '\''], "");
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }

    parse_general(clean).or_else(|| parse_custom_layout(clean))
}

fn parse_general(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc())
}

fn parse_custom_layout(s: &str) -> Option<DateTime<Utc>> {
    let caps = CUSTOM_LAYOUT.captures(s)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
    let time = NaiveTime::from_hms_opt(num(4)?, num(5)?, num(6).unwrap_or(0))?;
    Some(date.and_time(time).and_utc())
}
