use crate::config::{LocalStorage, StationConfig};
use crate::core::dashboard::DashboardSource;
use crate::core::observations::ObservationLog;
use crate::utils::error::{ErrorCategory, WxError};
use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StationConfig>,
    pub storage: LocalStorage,
    pub observations: Arc<ObservationLog<LocalStorage>>,
    pub dashboard: Arc<DashboardSource<LocalStorage>>,
}

impl AppState {
    pub fn new(config: StationConfig) -> crate::Result<Self> {
        let storage = LocalStorage::new(&config.storage.data_dir);
        let observations = ObservationLog::new(storage.clone(), config.storage.observations_file.clone());
        let dashboard = DashboardSource::new(storage.clone(), &config)?;
        Ok(Self {
            config: Arc::new(config),
            storage,
            observations: Arc::new(observations),
            dashboard: Arc::new(dashboard),
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("data_dir", &self.storage.base_path())
            .field("observations", &self.observations.path())
            .finish()
    }
}

/// Body of `GET /addWeatherObservation` on success.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObservationAck {
    pub dateutc: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub station: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeriesQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Always false.
    pub success: bool,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }),
    )
}

impl From<WxError> for ApiError {
    fn from(err: WxError) -> Self {
        let (status, code) = match &err {
            WxError::ValidationError { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            _ => match err.category() {
                ErrorCategory::Network => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
                ErrorCategory::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
                ErrorCategory::Configuration => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                ErrorCategory::Data => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR"),
            },
        };
        if status.is_server_error() {
            tracing::error!("❌ Request failed: {} (severity {:?})", err, err.severity());
        } else {
            tracing::warn!("Rejected request: {}", err);
        }
        error_response(status, code, err.to_string())
    }
}
