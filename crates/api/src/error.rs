//! Error Responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use prediction_service::{ErrorKind, ServiceError};
use serde::Serialize;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<&'static str>,
}

/// Error response with its status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// 400 for bodies that never reach validation
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "Invalid input data",
                detail: detail.into(),
                fields: Vec::new(),
            },
        }
    }

    /// Map a service failure to a status and a caller-safe body
    pub fn from_service(err: &ServiceError, expose_detail: bool) -> Self {
        let (status, error) = match err.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "Invalid input data"),
            ErrorKind::ModelUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Model unavailable"),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed"),
        };
        Self {
            status,
            body: ErrorBody {
                error,
                detail: err.public_detail(expose_detail),
                fields: err.fields(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
