//! Metrics Routes

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use feature_engine::{FEATURE_DIMENSION, FEATURE_SCHEMA_VERSION};
use inference_engine::{ModelInfo, ModelState};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Feature schema served by this build
#[derive(Debug, Serialize)]
pub struct SchemaInfo {
    pub version: &'static str,
    pub dimension: usize,
}

/// Read-only operational snapshot
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_state: ModelState,
    pub model: Option<ModelInfo>,
    pub feature_schema: SchemaInfo,
}

/// Model identity, uptime and status
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let model = state.service.model();
    let model_state = model.state();
    let status = match model_state {
        ModelState::Ready => "operational",
        ModelState::NotStarted | ModelState::Loading => "starting",
        ModelState::Failed => "failed",
        ModelState::ShuttingDown => "stopping",
    };

    Json(MetricsResponse {
        status,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model_state,
        model: model.info().cloned(),
        feature_schema: SchemaInfo {
            version: FEATURE_SCHEMA_VERSION,
            dimension: FEATURE_DIMENSION,
        },
    })
}

/// Prometheus text exposition, when the recorder is installed
pub async fn get_prometheus(State(state): State<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "prometheus exporter disabled").into_response(),
    }
}
