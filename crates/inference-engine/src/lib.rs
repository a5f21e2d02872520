//! Model Inference Engine
//!
//! Owns the trip duration estimator for the lifetime of the process. The
//! estimator is any [`Regressor`]; ONNX graphs run through tract, and simple
//! linear fits can be shipped as JSON.

mod engine;
mod linear;
mod onnx;
mod regressor;
mod schema;

pub use engine::{ModelConfig, ModelFormat, ModelHandle, ModelInfo, ModelState};
pub use linear::LinearRegressor;
pub use onnx::OnnxRegressor;
pub use regressor::Regressor;
pub use schema::SchemaManifest;

use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Feature schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },
    #[error("Model unavailable (state: {0})")]
    ModelUnavailable(ModelState),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}

impl InferenceError {
    /// Whether this error can only happen while loading
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            InferenceError::ModelLoadError(_) | InferenceError::SchemaMismatch { .. }
        )
    }
}
