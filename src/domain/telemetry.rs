// Telemetry data domain models
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Key used for the timestamp field when a record is flattened (JSON, CSV export)
pub const TIMESTAMP_KEY: &str = "timestamp";

/// One device column value inside a record. `None` means the sensor was idle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: String,
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(device_id: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            device_id: device_id.into(),
            value,
        }
    }
}

/// One timestamped row of the ingested dataset.
///
/// Readings keep the column order of the source header. Every discovered
/// column is present, either with a finite number or with an explicit `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub readings: Vec<Reading>,
}

impl Record {
    pub fn new(timestamp: DateTime<Utc>, readings: Vec<Reading>) -> Self {
        Self {
            timestamp,
            readings,
        }
    }

    /// Numeric value for a device, `None` when idle or when the column is unknown
    pub fn value(&self, device_id: &str) -> Option<f64> {
        self.readings
            .iter()
            .find(|r| r.device_id == device_id)
            .and_then(|r| r.value)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.readings.iter().map(|r| r.device_id.as_str())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.readings.len() + 1))?;
        map.serialize_entry(TIMESTAMP_KEY, &self.timestamp)?;
        for reading in &self.readings {
            map.serialize_entry(&reading.device_id, &reading.value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorPair {
    pub color: &'static str,
    pub fill_color: &'static str,
}

const fn pair(color: &'static str, fill_color: &'static str) -> ColorPair {
    ColorPair { color, fill_color }
}

/// Chart palette, assigned to devices by sorted position and reused cyclically
pub const CHART_PALETTE: [ColorPair; 15] = [
    pair("#F4A261", "rgba(244, 162, 97, 0.2)"),
    pair("#2A9D8F", "rgba(42, 157, 143, 0.2)"),
    pair("#E9C46A", "rgba(233, 196, 106, 0.2)"),
    pair("#E76F51", "rgba(231, 111, 81, 0.2)"),
    pair("#264653", "rgba(38, 70, 83, 0.2)"),
    pair("#8AB17D", "rgba(138, 177, 125, 0.2)"),
    pair("#B5838D", "rgba(181, 131, 141, 0.2)"),
    pair("#FFB4A2", "rgba(255, 180, 162, 0.2)"),
    pair("#6D6875", "rgba(109, 104, 117, 0.2)"),
    pair("#A5A58D", "rgba(165, 165, 141, 0.2)"),
    pair("#F4D35E", "rgba(244, 211, 94, 0.2)"),
    pair("#EE964B", "rgba(238, 150, 75, 0.2)"),
    pair("#F95738", "rgba(249, 87, 56, 0.2)"),
    pair("#4CC9F0", "rgba(76, 201, 240, 0.2)"),
    pair("#7209B7", "rgba(114, 9, 183, 0.2)"),
];

/// A monitored data column discovered from the source schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub display_name: String,
    pub color_index: usize,
}

impl DeviceDescriptor {
    pub fn new(id: String, color_index: usize) -> Self {
        let display_name = id.clone();
        Self {
            id,
            display_name,
            color_index,
        }
    }

    pub fn colors(&self) -> ColorPair {
        CHART_PALETTE[self.color_index % CHART_PALETTE.len()]
    }
}

/// Summary statistics over the two most recent filtered records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub avg_now: f64,
    pub avg_prev: f64,
    pub avg_delta: f64,
    pub max_temp: Option<f64>,
    pub max_device_id: Option<String>,
    pub active_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// Latest state of a single device, as shown on its card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub delta: f64,
    pub is_high: bool,
    pub recent: Vec<TimeSeriesPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Record {
        Record::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            vec![Reading::new("TR1", Some(41.5)), Reading::new("TR2", None)],
        )
    }

    #[test]
    fn test_value_lookup() {
        let record = sample();
        assert_eq!(record.value("TR1"), Some(41.5));
        assert_eq!(record.value("TR2"), None);
        assert_eq!(record.value("TR9"), None);
        assert_eq!(record.device_ids().collect::<Vec<_>>(), vec!["TR1", "TR2"]);
    }

    #[test]
    fn test_record_serializes_flat() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(json["TR1"], 41.5);
        assert!(json["TR2"].is_null());
    }

    #[test]
    fn test_palette_wraps() {
        let first = DeviceDescriptor::new("TR1".to_string(), 0);
        let wrapped = DeviceDescriptor::new("TR16".to_string(), CHART_PALETTE.len());
        assert_eq!(first.colors(), wrapped.colors());
        assert_eq!(first.display_name, "TR1");
    }
}
