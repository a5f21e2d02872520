//! Per-request Error Taxonomy

use data_validator::ValidationErrors;
use feature_engine::FeatureError;
use inference_engine::{InferenceError, ModelState};
use thiserror::Error;

/// Coarse class of a failure, used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller sent bad input
    Validation,
    /// Model is not in the `Ready` state
    ModelUnavailable,
    /// Anything else; the request failed, the process carries on
    Internal,
}

/// Errors from a single prediction request
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input data: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Model unavailable (state: {0})")]
    ModelUnavailable(ModelState),

    #[error("Feature computation failed: {0}")]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Inference(InferenceError),
}

impl From<InferenceError> for ServiceError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ModelUnavailable(state) => ServiceError::ModelUnavailable(state),
            other => ServiceError::Inference(other),
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            ServiceError::Feature(_) | ServiceError::Inference(_) => ErrorKind::Internal,
        }
    }

    /// Fields named by a validation failure, empty otherwise
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ServiceError::Validation(errors) => errors.fields(),
            _ => Vec::new(),
        }
    }

    /// Detail safe to return to a caller.
    ///
    /// Internal failures are reduced to a generic message unless `expose` is
    /// set.
    pub fn public_detail(&self, expose: bool) -> String {
        match self {
            ServiceError::Validation(errors) => errors.to_string(),
            ServiceError::ModelUnavailable(state) => format!("model state is {}", state),
            ServiceError::Feature(_) | ServiceError::Inference(_) if expose => self.to_string(),
            ServiceError::Feature(_) | ServiceError::Inference(_) => {
                "an internal error occurred while computing the prediction".to_string()
            }
        }
    }
}
