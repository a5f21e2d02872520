//! Linear Model Backend

use crate::regressor::Regressor;
use crate::InferenceError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Linear regression exported as JSON:
/// `{ "version": "...", "intercept": 0.0, "coefficients": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    /// Artifact version
    #[serde(default)]
    pub version: Option<String>,
    /// Bias term
    pub intercept: f64,
    /// One weight per feature, in schema order
    pub coefficients: Vec<f64>,
}

impl LinearRegressor {
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            version: None,
            intercept,
            coefficients,
        }
    }

    /// Read a JSON artifact from disk
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let data = fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        let model: Self = serde_json::from_str(&data).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: invalid linear model: {}", path.display(), e))
        })?;
        if let Some(bad) = model.coefficients.iter().position(|c| !c.is_finite()) {
            return Err(InferenceError::ModelLoadError(format!(
                "{}: coefficient {} is not finite",
                path.display(),
                bad
            )));
        }
        debug!(
            "Loaded linear model with {} coefficients from {}",
            model.coefficients.len(),
            path.display()
        );
        Ok(model)
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let values = features.values();
        if values.len() != self.coefficients.len() {
            return Err(InferenceError::InvalidInputShape {
                expected: self.coefficients.len().to_string(),
                actual: values.len().to_string(),
            });
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(values.iter())
            .map(|(c, x)| c * x)
            .sum();
        Ok(self.intercept + dot)
    }

    fn input_arity(&self) -> usize {
        self.coefficients.len()
    }

    fn kind(&self) -> &'static str {
        "linear"
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}
