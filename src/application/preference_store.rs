// Persisted user preferences (key -> JSON value)
use crate::domain::time_range::{bound_from_pref, bound_to_pref, TimeWindow};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub mod keys {
    pub const SOURCE_URL: &str = "source_url";
    pub const AUTO_REFRESH: &str = "auto_refresh";
    pub const SIDEBAR_OPEN: &str = "sidebar_open";
    pub const START_YEAR: &str = "start_year";
    pub const START_MONTH: &str = "start_month";
    pub const END_YEAR: &str = "end_year";
    pub const END_MONTH: &str = "end_month";
    pub const DISPLAY_NAMES: &str = "display_names";
    pub const SELECTED_DEVICES: &str = "selected_devices";
    pub const CLEARED_AGAINST: &str = "selection_cleared_against";
}

/// Abstract key/value store with JSON values
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Read a typed value; missing or mistyped entries read as `None`
pub fn load_value<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring unreadable preference");
            None
        }
    }
}

pub fn save_value<T: Serialize + ?Sized>(store: &dyn PreferenceStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?)
}

/// Preferences restored at startup
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub source_url: Option<String>,
    pub auto_refresh: bool,
    pub sidebar_open: bool,
    pub window: TimeWindow,
    pub display_names: HashMap<String, String>,
    /// `None` when no selection was ever saved
    pub selected_devices: Option<Vec<String>>,
    /// Device ids present when the selection was explicitly cleared
    pub cleared_against: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            source_url: None,
            auto_refresh: false,
            sidebar_open: true,
            window: TimeWindow::default(),
            display_names: HashMap::new(),
            selected_devices: None,
            cleared_against: Vec::new(),
        }
    }
}

impl Preferences {
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Self::default();
        let bound = |key: &str| load_value::<String>(store, key).unwrap_or_default();

        let window = TimeWindow {
            start_year: bound_from_pref(&bound(keys::START_YEAR)),
            start_month: bound_from_pref(&bound(keys::START_MONTH)),
            end_year: bound_from_pref(&bound(keys::END_YEAR)),
            end_month: bound_from_pref(&bound(keys::END_MONTH)),
        };

        Self {
            source_url: load_value(store, keys::SOURCE_URL),
            auto_refresh: load_value(store, keys::AUTO_REFRESH).unwrap_or(defaults.auto_refresh),
            sidebar_open: load_value(store, keys::SIDEBAR_OPEN).unwrap_or(defaults.sidebar_open),
            window: if window.is_valid() { window } else { TimeWindow::default() },
            display_names: load_value(store, keys::DISPLAY_NAMES).unwrap_or_default(),
            selected_devices: load_value(store, keys::SELECTED_DEVICES),
            cleared_against: load_value(store, keys::CLEARED_AGAINST).unwrap_or_default(),
        }
    }
}

/// Persist the four window bounds as strings, `"All"` when unset
pub fn save_window(store: &dyn PreferenceStore, window: &TimeWindow) -> Result<()> {
    save_value(store, keys::START_YEAR, &bound_to_pref(window.start_year))?;
    save_value(store, keys::START_MONTH, &bound_to_pref(window.start_month))?;
    save_value(store, keys::END_YEAR, &bound_to_pref(window.end_year))?;
    save_value(store, keys::END_MONTH, &bound_to_pref(window.end_month))
}

/// Non-persistent store, used when no preferences file is configured and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_empty() {
        let prefs = Preferences::load(&MemoryStore::new());
        assert_eq!(prefs, Preferences::default());
        assert!(prefs.sidebar_open);
        assert!(prefs.selected_devices.is_none());
    }

    #[test]
    fn test_round_trip() {
        let store = MemoryStore::new();
        let window = TimeWindow {
            start_year: Some(2023),
            start_month: None,
            end_year: Some(2024),
            end_month: Some(3),
        };
        save_window(&store, &window).unwrap();
        save_value(&store, keys::SOURCE_URL, "https://example.com/data.csv").unwrap();
        save_value(&store, keys::AUTO_REFRESH, &true).unwrap();
        save_value(&store, keys::SELECTED_DEVICES, &vec!["TR1".to_string()]).unwrap();
        let mut names = HashMap::new();
        names.insert("TR1".to_string(), "Main".to_string());
        save_value(&store, keys::DISPLAY_NAMES, &names).unwrap();

        assert_eq!(store.get(keys::START_MONTH), Some(json!("All")));
        assert_eq!(store.get(keys::END_MONTH), Some(json!("3")));

        let prefs = Preferences::load(&store);
        assert_eq!(prefs.window, window);
        assert_eq!(prefs.source_url.as_deref(), Some("https://example.com/data.csv"));
        assert!(prefs.auto_refresh);
        assert_eq!(prefs.selected_devices, Some(vec!["TR1".to_string()]));
        assert_eq!(prefs.display_names.get("TR1").map(String::as_str), Some("Main"));
    }

    #[test]
    fn test_explicit_empty_selection_survives() {
        let store = MemoryStore::new();
        save_value(&store, keys::SELECTED_DEVICES, &Vec::<String>::new()).unwrap();
        save_value(&store, keys::CLEARED_AGAINST, &vec!["TR1"]).unwrap();
        let prefs = Preferences::load(&store);
        assert_eq!(prefs.selected_devices, Some(Vec::new()));
        assert_eq!(prefs.cleared_against, vec!["TR1".to_string()]);
    }

    #[test]
    fn test_mistyped_values_fall_back() {
        let store = MemoryStore::new();
        store.set(keys::AUTO_REFRESH, json!("yes")).unwrap();
        store.set(keys::START_MONTH, json!("14")).unwrap();
        store.set(keys::START_YEAR, json!("2023")).unwrap();
        let prefs = Preferences::load(&store);
        assert!(!prefs.auto_refresh);
        assert_eq!(prefs.window, TimeWindow::default());
    }
}
