//! Prediction Route

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use prediction_service::PredictionResult;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Response header carrying the id logged for the request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Successful prediction body
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// Duration in whole seconds
    pub prediction: u64,
    pub formatted_time: String,
    pub prediction_time_ms: f64,
    pub processing_time_ms: f64,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            prediction: result.duration_seconds,
            formatted_time: result.formatted_time,
            prediction_time_ms: result.prediction_time_ms,
            processing_time_ms: result.processing_time_ms,
        }
    }
}

/// Predict a trip duration
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let raw = match payload {
        Ok(Json(Value::Object(map))) => map,
        Ok(Json(_)) => {
            info!(target: "prediction_service::request", outcome = "invalid", "request body is not a JSON object");
            return ApiError::bad_request("request body must be a JSON object").into_response();
        }
        Err(rejection) => {
            let detail = rejection.body_text();
            info!(target: "prediction_service::request", outcome = "invalid", %detail, "unreadable request body");
            return ApiError::bad_request(detail).into_response();
        }
    };

    match state.service.predict(&raw) {
        Ok(result) => {
            let request_id = result.request_id.to_string();
            (
                [(REQUEST_ID_HEADER, request_id)],
                Json(PredictResponse::from(result)),
            )
                .into_response()
        }
        Err(err) => {
            ApiError::from_service(&err, state.service.config().expose_error_detail).into_response()
        }
    }
}
