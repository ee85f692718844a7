// CSV export, the inverse of ingestion
use super::telemetry::{Record, TIMESTAMP_KEY};
use crate::error::Result;
use chrono::SecondsFormat;

/// Serialize records back to CSV.
///
/// The header is `timestamp` followed by the first record's columns.
/// Timestamps are RFC 3339 in UTC, idle readings are empty cells, and any
/// field containing a comma is quoted.
pub fn export_csv(records: &[Record]) -> Result<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };
    let columns: Vec<&str> = first.device_ids().collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(std::iter::once(TIMESTAMP_KEY).chain(columns.iter().copied()))?;

    for record in records {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(record.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        row.extend(
            columns
                .iter()
                .map(|id| record.value(id).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
