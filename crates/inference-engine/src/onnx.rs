//! ONNX Model Backend using tract

use crate::regressor::Regressor;
use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Regressor backed by an optimised ONNX graph.
///
/// The graph must take one `[1, 15]` float input and produce a single value.
/// Its version comes from the schema manifest, not the artifact.
pub struct OnnxRegressor {
    plan: OnnxPlan,
}

impl OnnxRegressor {
    /// Load, optimise and warm up an ONNX model
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        info!("Loading ONNX model from {}", path.display());
        let load_error =
            |e: TractError| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e));

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, FEATURE_DIMENSION]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(load_error)?;

        let regressor = Self { plan };

        // A forward pass on zeros proves the graph accepts the schema width
        // and returns a scalar before any traffic is served.
        let warmup = regressor
            .run(&[0.0; FEATURE_DIMENSION])
            .map_err(|e| InferenceError::ModelLoadError(format!("warmup failed: {}", e)))?;
        debug!("ONNX warmup forward ok (output={})", warmup);

        Ok(regressor)
    }

    fn run(&self, values: &[f32]) -> Result<f64, InferenceError> {
        let input = Tensor::from_shape(&[1, values.len()], values).map_err(|e| {
            InferenceError::InvalidInputShape {
                expected: format!("[1, {}]", FEATURE_DIMENSION),
                actual: e.to_string(),
            }
        })?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".to_string()))?;
        let output = output
            .cast_to::<f64>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let values = output
            .as_slice::<f64>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        match values {
            [y] => Ok(*y),
            other => Err(InferenceError::InvalidInputShape {
                expected: "1 output value".to_string(),
                actual: format!("{} output values", other.len()),
            }),
        }
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        self.run(&features.to_f32())
    }

    fn input_arity(&self) -> usize {
        // Fixed by the input fact the graph was optimised with
        FEATURE_DIMENSION
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
