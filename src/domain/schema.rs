// Device schema derivation and selection reconciliation
use super::telemetry::{DeviceDescriptor, Record};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Derive the device schema from the first record's columns.
///
/// Ids carrying a number ("TR 2", "TR10") sort by that number; ids without
/// one sort after them alphabetically. Colours follow the sorted position.
pub fn derive_schema(records: &[Record]) -> Vec<DeviceDescriptor> {
    let Some(first) = records.first() else {
        return Vec::new();
    };

    let mut ids: Vec<String> = first.device_ids().map(str::to_string).collect();
    ids.sort_by(|a, b| compare_device_ids(a, b));

    ids.into_iter()
        .enumerate()
        .map(|(idx, id)| DeviceDescriptor::new(id, idx))
        .collect()
}

fn compare_device_ids(a: &str, b: &str) -> Ordering {
    match (leading_number(a), leading_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// First run of ASCII digits in the id, if it fits in a u64
fn leading_number(id: &str) -> Option<u64> {
    let start = id.find(|c: char| c.is_ascii_digit())?;
    let digits: String = id[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Reconcile a previous selection against a freshly derived id set.
///
/// `None` means there is no prior choice (first load or reset) and selects
/// everything. An explicitly emptied selection stays empty while the schema it
/// was cleared against (`cleared_against`) still shares an id with `new_ids`;
/// after a complete schema replacement every new id is selected. Otherwise the
/// surviving ids are kept, and if none survive every new id is selected.
/// The result follows the order of `new_ids`.
pub fn reconcile_selection(
    previous: Option<&[String]>,
    cleared_against: &[String],
    new_ids: &[String],
) -> Vec<String> {
    let Some(previous) = previous else {
        return new_ids.to_vec();
    };
    if previous.is_empty() {
        if new_ids.iter().any(|id| cleared_against.contains(id)) {
            return Vec::new();
        }
        tracing::info!("schema replaced since selection was cleared, selecting all devices");
        return new_ids.to_vec();
    }

    let previous: HashSet<&str> = previous.iter().map(String::as_str).collect();
    let kept: Vec<String> = new_ids
        .iter()
        .filter(|id| previous.contains(id.as_str()))
        .cloned()
        .collect();

    if kept.is_empty() {
        tracing::info!("selection no longer matches schema, selecting all devices");
        new_ids.to_vec()
    } else {
        kept
    }
}

/// Overlay user-entered labels on derived descriptors. Blank labels are ignored.
pub fn apply_display_names(
    descriptors: &[DeviceDescriptor],
    overrides: &HashMap<String, String>,
) -> Vec<DeviceDescriptor> {
    descriptors
        .iter()
        .map(|d| {
            let mut named = d.clone();
            if let Some(label) = overrides.get(&d.id).filter(|l| !l.trim().is_empty()) {
                named.display_name = label.clone();
            }
            named
        })
        .collect()
}
