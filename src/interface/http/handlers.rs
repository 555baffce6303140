use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::{LoadReport, MonitorStatus, MonitoringService, SessionStore};
use crate::domain::{ConvertedSample, NetworkInterface, SpeedUnit, ThroughputSample};
use crate::error::{SamplerError, SessionError};

/// Error type that implements IntoResponse
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let status = match &err {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::InvalidName(_) => StatusCode::BAD_REQUEST,
            SessionError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<SamplerError> for AppError {
    fn from(err: SamplerError) -> Self {
        let status = match &err {
            SamplerError::InterfaceNotFound(_) => StatusCode::NOT_FOUND,
            SamplerError::InterfaceGone(_) => StatusCode::SERVICE_UNAVAILABLE,
            SamplerError::Sample { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for AppError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitoring_service: Arc<MonitoringService>,
}

impl AppState {
    fn store(&self) -> Arc<SessionStore> {
        self.monitoring_service.store().clone()
    }
}

/// Run blocking session file I/O off the async workers
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&SessionStore) -> Result<T, SessionError> + Send + 'static,
{
    let store = state.store();
    let result = tokio::task::spawn_blocking(move || f(&store)).await?;
    Ok(result?)
}

/// Latest speed in both units
#[derive(Debug, Serialize)]
pub struct SpeedReading {
    pub timestamp: NaiveDateTime,
    pub upload_mb_per_s: f64,
    pub download_mb_per_s: f64,
    pub upload_mbit_per_s: f64,
    pub download_mbit_per_s: f64,
    pub upload_label: String,
    pub download_label: String,
}

impl SpeedReading {
    fn new(sample: &ThroughputSample, unit: SpeedUnit) -> Self {
        Self {
            timestamp: sample.timestamp,
            upload_mb_per_s: sample.upload_mb_per_s,
            download_mb_per_s: sample.download_mb_per_s,
            upload_mbit_per_s: sample.upload_mbit_per_s(),
            download_mbit_per_s: sample.download_mbit_per_s(),
            upload_label: unit.format(sample.upload_mb_per_s),
            download_label: unit.format(sample.download_mb_per_s),
        }
    }
}

/// Response for /api/speed
#[derive(Debug, Serialize)]
pub struct SpeedResponse {
    pub interface: String,
    pub running: bool,
    pub latest: Option<SpeedReading>,
}

/// Response for /api/history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub unit: SpeedUnit,
    pub capacity: usize,
    pub samples: Vec<ConvertedSample>,
}

/// Response for /api/interfaces
#[derive(Debug, Serialize)]
pub struct InterfacesResponse {
    pub timestamp: String,
    pub interfaces: Vec<NetworkInterface>,
}

/// Response for /api/monitor/start and /api/monitor/stop
#[derive(Debug, Serialize)]
pub struct MonitorResponse {
    pub running: bool,
    pub changed: bool,
}

/// Response for /api/sessions
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<String>,
}

/// Response for a saved or deleted session
#[derive(Debug, Serialize)]
pub struct SessionFileResponse {
    pub path: PathBuf,
}

/// Query params for /api/history and /api/speed
#[derive(Debug, Deserialize)]
pub struct UnitQuery {
    #[serde(default)]
    pub unit: SpeedUnit,
}

/// Optional body for POST /api/sessions
#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    pub filename: Option<String>,
}

/// Handler for GET /api/health
pub async fn health_handler() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "wifimon"
        })),
    )
}

/// Handler for GET /api/status
#[debug_handler]
pub async fn status_handler(State(state): State<AppState>) -> Json<MonitorStatus> {
    Json(state.monitoring_service.status())
}

/// Handler for GET /api/interfaces
#[debug_handler]
pub async fn interfaces_handler(State(state): State<AppState>) -> Result<Json<InterfacesResponse>, AppError> {
    let interfaces = state.monitoring_service.list_interfaces()?;
    Ok(Json(InterfacesResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        interfaces,
    }))
}

/// Handler for GET /api/speed
#[debug_handler]
pub async fn speed_handler(State(state): State<AppState>, Query(params): Query<UnitQuery>) -> Json<SpeedResponse> {
    let service = &state.monitoring_service;
    Json(SpeedResponse {
        interface: service.interface().to_string(),
        running: service.is_running(),
        latest: service.latest().map(|s| SpeedReading::new(&s, params.unit)),
    })
}

/// Handler for GET /api/history
#[debug_handler]
pub async fn history_handler(State(state): State<AppState>, Query(params): Query<UnitQuery>) -> Json<HistoryResponse> {
    let store = state.monitoring_service.store();
    Json(HistoryResponse {
        unit: params.unit,
        capacity: store.capacity(),
        samples: store.history().iter().map(|s| s.in_unit(params.unit)).collect(),
    })
}

/// Handler for DELETE /api/history
pub async fn clear_history_handler(State(state): State<AppState>) -> StatusCode {
    state.monitoring_service.store().clear();
    StatusCode::NO_CONTENT
}

/// Handler for POST /api/monitor/start
pub async fn start_handler(State(state): State<AppState>) -> Result<Json<MonitorResponse>, AppError> {
    let changed = state.monitoring_service.start()?;
    Ok(Json(MonitorResponse {
        running: true,
        changed,
    }))
}

/// Handler for POST /api/monitor/stop
pub async fn stop_handler(State(state): State<AppState>) -> Json<MonitorResponse> {
    let changed = state.monitoring_service.stop();
    Json(MonitorResponse {
        running: false,
        changed,
    })
}

/// Handler for GET /api/sessions
pub async fn list_sessions_handler(State(state): State<AppState>) -> Result<Json<SessionsResponse>, AppError> {
    let sessions = with_store(&state, |store| store.list_sessions()).await?;
    Ok(Json(SessionsResponse { sessions }))
}

/// Handler for POST /api/sessions
pub async fn save_session_handler(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let request: SaveRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SaveRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            warn!("Rejected save request body: {}", e);
            AppError::new(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
        })?
    };

    let path = with_store(&state, move |store| store.save(request.filename.as_deref())).await?;
    Ok((StatusCode::CREATED, Json(SessionFileResponse { path })).into_response())
}

/// Handler for POST /api/sessions/{name}/load
pub async fn load_session_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LoadReport>, AppError> {
    let report = with_store(&state, move |store| store.load(&name)).await?;
    Ok(Json(report))
}

/// Handler for DELETE /api/sessions/{name}
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SessionFileResponse>, AppError> {
    let path = with_store(&state, move |store| store.delete_session(&name)).await?;
    Ok(Json(SessionFileResponse { path }))
}
