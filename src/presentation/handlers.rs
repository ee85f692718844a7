// HTTP request handlers
use crate::application::dashboard_service::{RefreshOutcome, RefreshTrigger};
use crate::domain::dashboard::{DashboardSnapshot, LoadError};
use crate::domain::time_range::TimeWindow;
use crate::error::TelemetryError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SourceRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct AutoRefreshRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct SidebarRequest {
    pub open: bool,
}

#[derive(Deserialize)]
pub struct LabelRequest {
    pub name: String,
}

impl IntoResponse for TelemetryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TelemetryError::AllTransportsFailed { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, LoadError::Unavailable.message())
            }
            TelemetryError::EmptyDataset => (StatusCode::UNPROCESSABLE_ENTITY, LoadError::Empty.message()),
            TelemetryError::InvalidSourceUrl { .. } => (StatusCode::BAD_REQUEST, "invalid source url"),
            TelemetryError::InvalidTimeWindow => (StatusCode::BAD_REQUEST, "invalid time window"),
            TelemetryError::UnknownDevice(_) => (StatusCode::NOT_FOUND, "unknown device"),
            TelemetryError::Store(_)
            | TelemetryError::Export(_)
            | TelemetryError::Json(_)
            | TelemetryError::Io(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };

        (
            status,
            Json(json!({
                "error": message,
                "detail": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Full derived view: window-filtered records, KPIs, statuses, devices
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.dashboard_service.snapshot().await)
}

pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<RefreshOutcome>, TelemetryError> {
    let outcome = state.dashboard_service.refresh(RefreshTrigger::Manual).await?;
    Ok(Json(outcome))
}

/// Switch to a new remote source and load it immediately
pub async fn set_source(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SourceRequest>,
) -> Result<Json<RefreshOutcome>, TelemetryError> {
    let outcome = state.dashboard_service.change_source(&req.url).await?;
    Ok(Json(outcome))
}

pub async fn set_auto_refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AutoRefreshRequest>,
) -> StatusCode {
    state.dashboard_service.set_auto_refresh(req.enabled).await;
    StatusCode::NO_CONTENT
}

pub async fn set_sidebar(State(state): State<Arc<AppState>>, Json(req): Json<SidebarRequest>) -> StatusCode {
    state.dashboard_service.set_sidebar_open(req.open).await;
    StatusCode::NO_CONTENT
}

pub async fn set_window(
    State(state): State<Arc<AppState>>,
    Json(window): Json<TimeWindow>,
) -> Result<StatusCode, TelemetryError> {
    state.dashboard_service.set_time_window(window).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_all(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.dashboard_service.select_all().await)
}

pub async fn clear_selection(State(state): State<Arc<AppState>>) -> StatusCode {
    state.dashboard_service.clear_selection().await;
    StatusCode::NO_CONTENT
}

pub async fn toggle_device(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, TelemetryError> {
    Ok(Json(state.dashboard_service.toggle_device(&id).await?))
}

pub async fn set_label(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LabelRequest>,
) -> Result<StatusCode, TelemetryError> {
    state.dashboard_service.set_display_name(&id, &req.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Raw CSV text in the request body
pub async fn upload(State(state): State<Arc<AppState>>, body: String) -> Result<impl IntoResponse, TelemetryError> {
    let records = state.dashboard_service.ingest_upload(&body).await?;
    Ok(Json(json!({ "records": records })))
}

pub async fn export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, TelemetryError> {
    let csv = state.dashboard_service.export_filtered().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"telemetry.csv\""),
        ],
        csv,
    ))
}
