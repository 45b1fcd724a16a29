//! Health and metrics routes

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelStatus,
    pub detection: DetectionSettings,
}

/// Landmark model status
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub ready: bool,
    pub name: Option<String>,
}

/// Thresholds the analyzer applies
#[derive(Debug, Serialize)]
pub struct DetectionSettings {
    pub ear_threshold: f32,
    pub consec_frames: u32,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let model = ModelStatus {
        ready: state.landmarks.is_some(),
        name: state.landmarks.as_ref().map(|m| m.name().to_string()),
    };

    Json(HealthResponse {
        status: if model.ready { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model,
        detection: DetectionSettings {
            ear_threshold: state.dms.ear_threshold,
            consec_frames: state.dms.consec_frames,
        },
    })
}

/// Prometheus exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}
