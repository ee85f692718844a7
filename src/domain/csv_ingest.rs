// Schema-agnostic CSV ingestion
use super::date_parser::parse_timestamp;
use super::telemetry::{Reading, Record};
use regex::Regex;
use std::sync::LazyLock;

/// Header substrings that mark the timestamp column (ko, en, ja, zh exports)
const TIMESTAMP_KEYWORDS: &[&str] = &[
    "일시", "시간", "date", "time", "timestamp", "日時", "時間", "日期", "时间",
];

// Leading decimal number, so "45.3°C" reads as 45.3
static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("regex is valid")
});

/// Column layout discovered from a header row
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLayout {
    pub timestamp_index: usize,
    /// (column index, header) for every data column, in header order
    pub data_columns: Vec<(usize, String)>,
}

impl CsvLayout {
    pub fn from_header(header_line: &str) -> Self {
        let headers: Vec<String> = header_line.split(',').map(clean_cell).collect();

        let timestamp_index = headers
            .iter()
            .position(|h| {
                let lower = h.to_lowercase();
                TIMESTAMP_KEYWORDS.iter().any(|k| lower.contains(k))
            })
            .unwrap_or(0);

        // a repeated header keeps its first position but reads the last column
        let mut data_columns: Vec<(usize, String)> = Vec::new();
        for (idx, header) in headers.into_iter().enumerate() {
            if idx == timestamp_index || header.is_empty() {
                continue;
            }
            match data_columns.iter_mut().find(|(_, h)| *h == header) {
                Some(existing) => existing.0 = idx,
                None => data_columns.push((idx, header)),
            }
        }

        Self {
            timestamp_index,
            data_columns,
        }
    }
}

/// Parse raw CSV text into records, in input row order.
///
/// Headers and cells are split on plain commas; quoted commas are not
/// supported. Bad cells become idle (`None`) readings and only rows with no
/// timestamp cell are dropped, so this always completes.
pub fn parse_csv(text: &str) -> Vec<Record> {
    let lines: Vec<&str> = text.trim().lines().collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let layout = CsvLayout::from_header(lines[0]);
    let mut records = Vec::with_capacity(lines.len() - 1);
    let mut skipped = 0usize;

    for line in &lines[1..] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cells: Vec<&str> = line.split(',').collect();
        let Some(raw_timestamp) = cells.get(layout.timestamp_index) else {
            skipped += 1;
            continue;
        };

        let readings = layout
            .data_columns
            .iter()
            .map(|(idx, header)| {
                let value = cells.get(*idx).and_then(|cell| parse_value(cell));
                Reading::new(header.clone(), value)
            })
            .collect();

        records.push(Record::new(parse_timestamp(raw_timestamp), readings));
    }

    tracing::debug!(
        rows = records.len(),
        skipped,
        columns = layout.data_columns.len(),
        timestamp_column = layout.timestamp_index,
        "parsed csv"
    );
    records
}

fn clean_cell(cell: &str) -> String {
    let trimmed = cell.trim();
    let unquoted = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);
    unquoted.trim().to_string()
}

fn parse_value(cell: &str) -> Option<f64> {
    let clean = clean_cell(cell);
    if clean.is_empty() {
        return None;
    }
    NUMERIC_PREFIX
        .find(&clean)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
