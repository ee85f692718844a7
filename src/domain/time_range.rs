// Inclusive year/month window filtering
use super::telemetry::Record;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Sentinel used when a window bound is persisted as "unset"
pub const ALL: &str = "All";

/// Inclusive year/month range. Any bound may be unset; a year without a month
/// covers the whole year on either end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_year: Option<i32>,
    pub start_month: Option<u32>,
    pub end_year: Option<i32>,
    pub end_month: Option<u32>,
}

impl TimeWindow {
    pub fn is_valid(&self) -> bool {
        [self.start_month, self.end_month]
            .iter()
            .flatten()
            .all(|m| (1..=12).contains(m))
    }

    fn lower_bound(&self) -> Option<i64> {
        self.start_year
            .map(|y| month_index(y, self.start_month.unwrap_or(1)))
    }

    fn upper_bound(&self) -> Option<i64> {
        self.end_year
            .map(|y| month_index(y, self.end_month.unwrap_or(12)))
    }

    pub fn contains(&self, record: &Record) -> bool {
        let value = month_index(record.timestamp.year(), record.timestamp.month());
        self.lower_bound().is_none_or(|lo| lo <= value)
            && self.upper_bound().is_none_or(|hi| value <= hi)
    }
}

fn month_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + (i64::from(month) - 1)
}

/// Records whose calendar month (UTC) falls inside the window
pub fn filter_records(records: &[Record], window: &TimeWindow) -> Vec<Record> {
    records
        .iter()
        .filter(|r| window.contains(r))
        .cloned()
        .collect()
}

/// Distinct calendar years present in the dataset, newest first
pub fn available_years(records: &[Record]) -> Vec<i32> {
    let mut years: Vec<i32> = records.iter().map(|r| r.timestamp.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Format a bound for the preference store, `"All"` when unset
pub fn bound_to_pref<T: ToString>(bound: Option<T>) -> String {
    bound.map_or_else(|| ALL.to_string(), |v| v.to_string())
}

/// Read a persisted bound; `"All"` and unparsable strings mean unset
pub fn bound_from_pref<T: std::str::FromStr>(raw: &str) -> Option<T> {
    match raw.trim() {
        ALL => None,
        other => other.parse().ok(),
    }
}
