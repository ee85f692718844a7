// Dashboard domain model, the derived state handed to the presentation layer
use super::telemetry::{DeviceDescriptor, DeviceStatus, Kpis, Record};
use super::time_range::TimeWindow;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where the current dataset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Remote,
    Local,
}

/// User-visible load failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadError {
    /// Every transport failed
    Unavailable,
    /// The source parsed to zero records
    Empty,
}

impl LoadError {
    pub fn message(&self) -> &'static str {
        match self {
            LoadError::Unavailable => "could not load data",
            LoadError::Empty => "data is empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceView {
    #[serde(flatten)]
    pub descriptor: DeviceDescriptor,
    pub color: &'static str,
    pub fill_color: &'static str,
    pub selected: bool,
}

impl DeviceView {
    pub fn new(descriptor: DeviceDescriptor, selected: bool) -> Self {
        let colors = descriptor.colors();
        Self {
            descriptor,
            color: colors.color,
            fill_color: colors.fill_color,
            selected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiView {
    #[serde(flatten)]
    pub kpis: Kpis,
    /// Display name of the hottest device
    pub max_device_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub source_url: String,
    pub source: DataSource,
    pub auto_refresh: bool,
    pub sidebar_open: bool,
    pub refreshing: bool,
    pub error: Option<LoadError>,
    pub error_message: Option<&'static str>,
    pub last_updated: Option<DateTime<Utc>>,
    pub total_records: usize,
    pub window: TimeWindow,
    pub available_years: Vec<i32>,
    pub devices: Vec<DeviceView>,
    pub selected: Vec<String>,
    pub kpis: Option<KpiView>,
    pub statuses: Vec<DeviceStatus>,
    pub records: Vec<Record>,
}
