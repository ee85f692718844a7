// Dashboard service - Owns the dataset and user preferences, runs refreshes
use crate::application::preference_store::{keys, save_window, PreferenceStore, Preferences};
use crate::application::transport::TransportResolver;
use crate::domain::csv_ingest::parse_csv;
use crate::domain::dashboard::{DashboardSnapshot, DataSource, DeviceView, KpiView, LoadError};
use crate::domain::export::export_csv;
use crate::domain::kpi::{aggregate_kpis, device_statuses};
use crate::domain::schema::{apply_display_names, derive_schema, reconcile_selection};
use crate::domain::telemetry::{DeviceDescriptor, Record};
use crate::domain::time_range::{available_years, filter_records, TimeWindow};
use crate::error::{Result, TelemetryError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// User asked for fresh data; waits for any refresh in flight
    Manual,
    /// Poller tick; dropped when a refresh is in flight
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Loaded { records: usize },
    /// Background tick while busy, with auto-refresh off, or on a local dataset
    Skipped,
    /// The source changed while the fetch was in flight
    Discarded,
}

struct DashboardState {
    source_url: String,
    source: DataSource,
    auto_refresh: bool,
    sidebar_open: bool,
    refreshing: bool,
    window: TimeWindow,
    records: Vec<Record>,
    schema: Vec<DeviceDescriptor>,
    /// `None` until a selection exists; `Some(empty)` is an explicit clear
    selection: Option<Vec<String>>,
    /// Schema ids at the time of an explicit clear
    cleared_against: Vec<String>,
    display_names: HashMap<String, String>,
    last_error: Option<LoadError>,
    last_updated: Option<DateTime<Utc>>,
    /// Bumped whenever the dataset source changes; stale fetches are dropped
    generation: u64,
}

impl DashboardState {
    fn device_ids(&self) -> Vec<String> {
        self.schema.iter().map(|d| d.id.clone()).collect()
    }

    fn has_device(&self, id: &str) -> bool {
        self.schema.iter().any(|d| d.id == id)
    }
}

#[derive(Clone)]
pub struct DashboardService {
    resolver: TransportResolver,
    store: Arc<dyn PreferenceStore>,
    warning_threshold: f64,
    state: Arc<Mutex<DashboardState>>,
    refresh_gate: Arc<Mutex<()>>,
}

impl DashboardService {
    pub fn new(
        resolver: TransportResolver,
        store: Arc<dyn PreferenceStore>,
        default_url: String,
        warning_threshold: f64,
    ) -> Self {
        let prefs = Preferences::load(store.as_ref());
        let state = DashboardState {
            source_url: prefs.source_url.unwrap_or(default_url),
            source: DataSource::Remote,
            auto_refresh: prefs.auto_refresh,
            sidebar_open: prefs.sidebar_open,
            refreshing: false,
            window: prefs.window,
            records: Vec::new(),
            schema: Vec::new(),
            selection: prefs.selected_devices,
            cleared_against: prefs.cleared_against,
            display_names: prefs.display_names,
            last_error: None,
            last_updated: None,
            generation: 0,
        };

        Self {
            resolver,
            store,
            warning_threshold,
            state: Arc::new(Mutex::new(state)),
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Fetch the remote source and replace the dataset.
    ///
    /// Failures keep the previous dataset. A background failure is only
    /// surfaced as a load error when there is no data to show yet.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<RefreshOutcome> {
        let _in_flight = match trigger {
            RefreshTrigger::Manual => self.refresh_gate.lock().await,
            RefreshTrigger::Background => match self.refresh_gate.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!("refresh already in flight, skipping tick");
                    return Ok(RefreshOutcome::Skipped);
                }
            },
        };

        let (url, generation) = {
            let mut state = self.state.lock().await;
            match trigger {
                RefreshTrigger::Background => {
                    if !state.auto_refresh || state.source != DataSource::Remote {
                        return Ok(RefreshOutcome::Skipped);
                    }
                }
                RefreshTrigger::Manual => {
                    state.source = DataSource::Remote;
                    state.last_error = None;
                }
            }
            state.refreshing = true;
            (state.source_url.clone(), state.generation)
        };

        let fetched = self.resolver.fetch(&url).await;

        let mut state = self.state.lock().await;
        state.refreshing = false;
        if state.generation != generation {
            tracing::info!(%url, "discarding data fetched for a superseded source");
            return Ok(RefreshOutcome::Discarded);
        }

        let background = trigger == RefreshTrigger::Background;
        let text = match fetched {
            Ok(text) => text,
            Err(e) => {
                if background && !state.records.is_empty() {
                    tracing::warn!(error = %e, "background refresh failed, keeping current data");
                } else {
                    tracing::error!(error = %e, "could not load data");
                    state.last_error = Some(LoadError::Unavailable);
                }
                return Err(e);
            }
        };

        let records = parse_csv(&text);
        if records.is_empty() {
            tracing::warn!(%url, "source returned no records");
            if !background {
                state.last_error = Some(LoadError::Empty);
            }
            return Err(TelemetryError::EmptyDataset);
        }

        let count = records.len();
        self.replace_dataset(&mut state, records).await;
        Ok(RefreshOutcome::Loaded { records: count })
    }

    /// Ingest a locally supplied CSV blob, bypassing the transports.
    /// Switches to local mode and turns auto-refresh off.
    pub async fn ingest_upload(&self, text: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.source = DataSource::Local;
        if state.auto_refresh {
            state.auto_refresh = false;
            self.persist(keys::AUTO_REFRESH, &false).await;
        }

        let records = parse_csv(text);
        if records.is_empty() {
            state.last_error = Some(LoadError::Empty);
            return Err(TelemetryError::EmptyDataset);
        }

        let count = records.len();
        self.replace_dataset(&mut state, records).await;
        tracing::info!(records = count, "uploaded dataset ingested");
        Ok(count)
    }

    async fn replace_dataset(&self, state: &mut DashboardState, records: Vec<Record>) {
        let schema = derive_schema(&records);
        if schema.is_empty() {
            tracing::warn!("dataset has no device columns, keeping previous selection");
        } else {
            let ids: Vec<String> = schema.iter().map(|d| d.id.clone()).collect();
            let selection = reconcile_selection(state.selection.as_deref(), &state.cleared_against, &ids);
            self.persist(keys::SELECTED_DEVICES, &selection).await;
            state.selection = Some(selection);
        }

        tracing::info!(
            records = records.len(),
            devices = schema.len(),
            "dataset replaced"
        );
        state.records = records;
        state.schema = schema;
        state.last_error = None;
        state.last_updated = Some(Utc::now());
    }

    /// Point the dashboard at a new remote source. Any fetch still in flight
    /// for the old source is discarded when it completes.
    pub async fn set_source_url(&self, url: &str) -> Result<()> {
        let url = url.trim();
        let parsed = reqwest::Url::parse(url).map_err(|e| TelemetryError::InvalidSourceUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TelemetryError::InvalidSourceUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let mut state = self.state.lock().await;
        state.source_url = url.to_string();
        state.source = DataSource::Remote;
        state.generation += 1;
        self.persist(keys::SOURCE_URL, url).await;
        tracing::info!(url, "source url changed");
        Ok(())
    }

    /// Change the source and load it
    pub async fn change_source(&self, url: &str) -> Result<RefreshOutcome> {
        self.set_source_url(url).await?;
        self.refresh(RefreshTrigger::Manual).await
    }

    pub async fn set_auto_refresh(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        state.auto_refresh = enabled;
        self.persist(keys::AUTO_REFRESH, &enabled).await;
    }

    pub async fn set_sidebar_open(&self, open: bool) {
        let mut state = self.state.lock().await;
        state.sidebar_open = open;
        self.persist(keys::SIDEBAR_OPEN, &open).await;
    }

    pub async fn set_time_window(&self, window: TimeWindow) -> Result<()> {
        if !window.is_valid() {
            return Err(TelemetryError::InvalidTimeWindow);
        }
        let mut state = self.state.lock().await;
        state.window = window;
        self.write_preferences("time window", move |store| save_window(store, &window))
            .await;
        Ok(())
    }

    /// Flip one device in or out of the selection
    pub async fn toggle_device(&self, id: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        if !state.has_device(id) {
            return Err(TelemetryError::UnknownDevice(id.to_string()));
        }

        let mut selection = state.selection.take().unwrap_or_default();
        if let Some(pos) = selection.iter().position(|s| s == id) {
            selection.remove(pos);
        } else {
            selection.push(id.to_string());
            // keep schema order
            let order = state.device_ids();
            selection.sort_by_key(|s| order.iter().position(|o| o == s));
        }

        self.persist(keys::SELECTED_DEVICES, &selection).await;
        state.selection = Some(selection.clone());
        Ok(selection)
    }

    pub async fn select_all(&self) -> Vec<String> {
        let mut state = self.state.lock().await;
        let all = state.device_ids();
        self.persist(keys::SELECTED_DEVICES, &all).await;
        state.selection = Some(all.clone());
        all
    }

    /// Explicitly empty the selection. Later ingestions keep it empty unless
    /// the schema is replaced outright.
    pub async fn clear_selection(&self) {
        let mut state = self.state.lock().await;
        let cleared_against = state.device_ids();
        self.persist(keys::SELECTED_DEVICES, &Vec::<String>::new()).await;
        self.persist(keys::CLEARED_AGAINST, &cleared_against).await;
        state.selection = Some(Vec::new());
        state.cleared_against = cleared_against;
    }

    /// Set a display label for a device; a blank label restores the id
    pub async fn set_display_name(&self, id: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.has_device(id) {
            return Err(TelemetryError::UnknownDevice(id.to_string()));
        }

        let name = name.trim();
        if name.is_empty() {
            state.display_names.remove(id);
        } else {
            state.display_names.insert(id.to_string(), name.to_string());
        }
        self.persist(keys::DISPLAY_NAMES, &state.display_names).await;
        Ok(())
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let state = self.state.lock().await;

        let filtered = filter_records(&state.records, &state.window);
        let named = apply_display_names(&state.schema, &state.display_names);
        let selected = state.selection.clone().unwrap_or_default();

        let kpis = aggregate_kpis(&filtered, &state.device_ids(), self.warning_threshold).map(|kpis| {
            let max_device_name = kpis.max_device_id.as_ref().map(|id| {
                named
                    .iter()
                    .find(|d| &d.id == id)
                    .map_or_else(|| id.clone(), |d| d.display_name.clone())
            });
            KpiView {
                kpis,
                max_device_name,
            }
        });

        let selected_devices: Vec<DeviceDescriptor> = named
            .iter()
            .filter(|d| selected.contains(&d.id))
            .cloned()
            .collect();
        let statuses = device_statuses(&filtered, &selected_devices, self.warning_threshold);

        let devices = named
            .into_iter()
            .map(|d| {
                let is_selected = selected.contains(&d.id);
                DeviceView::new(d, is_selected)
            })
            .collect();

        DashboardSnapshot {
            source_url: state.source_url.clone(),
            source: state.source,
            auto_refresh: state.auto_refresh,
            sidebar_open: state.sidebar_open,
            refreshing: state.refreshing,
            error: state.last_error,
            error_message: state.last_error.map(|e| e.message()),
            last_updated: state.last_updated,
            total_records: state.records.len(),
            window: state.window,
            available_years: available_years(&state.records),
            devices,
            selected,
            kpis,
            statuses,
            records: filtered,
        }
    }

    /// Filtered records as CSV
    pub async fn export_filtered(&self) -> Result<String> {
        let state = self.state.lock().await;
        export_csv(&filter_records(&state.records, &state.window))
    }

    /// Preference writes are best effort; the in-memory state stays authoritative
    async fn persist<T: Serialize + ?Sized>(&self, key: &'static str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.write_preferences(key, move |store| store.set(key, value)).await,
            Err(e) => tracing::warn!(key, error = %e, "failed to encode preference"),
        }
    }

    /// Run a store write off the async workers
    async fn write_preferences<F>(&self, what: &'static str, write: F)
    where
        F: FnOnce(&dyn PreferenceStore) -> Result<()> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || write(store.as_ref())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(what, error = %e, "failed to persist preference"),
            Err(e) => tracing::warn!(what, error = %e, "preference write task failed"),
        }
    }
}
