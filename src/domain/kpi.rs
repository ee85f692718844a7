// Rolling KPI aggregation over the latest records
use super::telemetry::{DeviceDescriptor, DeviceStatus, Kpis, Record, TimeSeriesPoint};

/// Temperature above which a device counts as a warning (°C)
pub const DEFAULT_WARNING_THRESHOLD: f64 = 60.0;

/// Number of trailing points kept for each device card
pub const RECENT_POINTS: usize = 5;

/// Summarise the last two records across `device_ids`.
///
/// Returns `None` when there is nothing to summarise.
pub fn aggregate_kpis(records: &[Record], device_ids: &[String], threshold: f64) -> Option<Kpis> {
    let last = records.last()?;
    if device_ids.is_empty() {
        return None;
    }
    let prev = records.len().checked_sub(2).map(|i| &records[i]);

    let valid_now = numeric_values(last, device_ids);
    let avg_now = mean(&valid_now);
    let avg_prev = prev.map_or(0.0, |p| mean(&numeric_values(p, device_ids)));
    let avg_delta = if prev.is_some() { avg_now - avg_prev } else { 0.0 };

    let mut hotspot: Option<(&str, f64)> = None;
    for id in device_ids {
        if let Some(value) = last.value(id) {
            if hotspot.is_none_or(|(_, max)| value > max) {
                hotspot = Some((id.as_str(), value));
            }
        }
    }

    let warning_count = valid_now.iter().filter(|v| **v > threshold).count();

    Some(Kpis {
        avg_now,
        avg_prev,
        avg_delta,
        max_temp: hotspot.map(|(_, v)| v),
        max_device_id: hotspot.map(|(id, _)| id.to_string()),
        active_count: valid_now.len(),
        warning_count,
    })
}

fn numeric_values(record: &Record, device_ids: &[String]) -> Vec<f64> {
    device_ids.iter().filter_map(|id| record.value(id)).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Per-device card state: latest value, change since the previous record,
/// high-temperature flag and a short trailing history.
pub fn device_statuses(
    records: &[Record],
    devices: &[DeviceDescriptor],
    threshold: f64,
) -> Vec<DeviceStatus> {
    let last = records.last();
    let prev = records.len().checked_sub(2).map(|i| &records[i]);
    let tail = &records[records.len().saturating_sub(RECENT_POINTS)..];

    devices
        .iter()
        .map(|device| {
            let current = last.and_then(|r| r.value(&device.id));
            let previous = prev.and_then(|r| r.value(&device.id));
            let delta = match (current, previous) {
                (Some(c), Some(p)) => c - p,
                _ => 0.0,
            };

            DeviceStatus {
                device_id: device.id.clone(),
                current,
                previous,
                delta,
                is_high: current.is_some_and(|c| c > threshold),
                recent: tail
                    .iter()
                    .map(|r| TimeSeriesPoint::new(r.timestamp, r.value(&device.id)))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv_ingest::parse_csv;
    use crate::domain::telemetry::Reading;
    use chrono::{Duration, TimeZone, Utc};

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn row(hour: i64, values: &[(&str, Option<f64>)]) -> Record {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
        Record::new(
            ts,
            values.iter().map(|(id, v)| Reading::new(*id, *v)).collect(),
        )
    }

    #[test]
    fn test_hotspot_and_warnings() {
        let records = vec![row(0, &[("A", Some(70.0)), ("B", Some(50.0)), ("C", None)])];
        let kpis = aggregate_kpis(&records, &ids(&["A", "B", "C"]), 60.0).unwrap();
        assert_eq!(kpis.warning_count, 1);
        assert_eq!(kpis.active_count, 2);
        assert_eq!(kpis.max_device_id.as_deref(), Some("A"));
        assert_eq!(kpis.max_temp, Some(70.0));
        assert_eq!(kpis.avg_now, 60.0);
        assert_eq!(kpis.avg_delta, 0.0);
    }

    #[test]
    fn test_two_row_example() {
        let records = parse_csv("ts,A,B\n2024-01-01 00:00,10,20\n2024-01-01 01:00,15,\n");
        let kpis = aggregate_kpis(&records, &ids(&["A", "B"]), DEFAULT_WARNING_THRESHOLD).unwrap();
        assert_eq!(kpis.avg_now, 15.0);
        assert_eq!(kpis.avg_prev, 15.0);
        assert_eq!(kpis.avg_delta, 0.0);
        assert_eq!(kpis.active_count, 1);
    }

    #[test]
    fn test_delta_against_previous() {
        let records = vec![
            row(0, &[("A", Some(40.0)), ("B", Some(44.0))]),
            row(1, &[("A", Some(45.0)), ("B", Some(47.0))]),
        ];
        let kpis = aggregate_kpis(&records, &ids(&["A", "B"]), 60.0).unwrap();
        assert_eq!(kpis.avg_prev, 42.0);
        assert_eq!(kpis.avg_delta, 4.0);
    }

    #[test]
    fn test_first_id_wins_ties() {
        let records = vec![row(0, &[("A", Some(55.0)), ("B", Some(61.0)), ("C", Some(61.0))])];
        let kpis = aggregate_kpis(&records, &ids(&["A", "B", "C"]), 60.0).unwrap();
        assert_eq!(kpis.max_device_id.as_deref(), Some("B"));
        assert_eq!(kpis.warning_count, 2);
    }

    #[test]
    fn test_all_idle() {
        let records = vec![row(0, &[("A", None)])];
        let kpis = aggregate_kpis(&records, &ids(&["A"]), 60.0).unwrap();
        assert_eq!(kpis.avg_now, 0.0);
        assert_eq!(kpis.max_temp, None);
        assert_eq!(kpis.max_device_id, None);
        assert_eq!(kpis.active_count, 0);
    }

    #[test]
    fn test_nothing_to_aggregate() {
        assert!(aggregate_kpis(&[], &ids(&["A"]), 60.0).is_none());
        let records = vec![row(0, &[("A", Some(1.0))])];
        assert!(aggregate_kpis(&records, &[], 60.0).is_none());
    }

    #[test]
    fn test_device_statuses() {
        let records: Vec<Record> = (0..7)
            .map(|h| row(h, &[("A", Some(50.0 + h as f64 * 2.0)), ("B", None)]))
            .collect();
        let devices = vec![
            DeviceDescriptor::new("A".to_string(), 0),
            DeviceDescriptor::new("B".to_string(), 1),
        ];

        let statuses = device_statuses(&records, &devices, 60.0);
        let a = &statuses[0];
        assert_eq!(a.current, Some(62.0));
        assert_eq!(a.previous, Some(60.0));
        assert_eq!(a.delta, 2.0);
        assert!(a.is_high);
        assert_eq!(a.recent.len(), RECENT_POINTS);
        assert_eq!(a.recent[0].value, Some(54.0));

        let b = &statuses[1];
        assert_eq!(b.current, None);
        assert_eq!(b.delta, 0.0);
        assert!(!b.is_high);
    }
}
