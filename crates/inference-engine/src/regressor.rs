//! Estimator Capability

use crate::InferenceError;
use feature_engine::FeatureVector;

/// A fitted regression estimator.
///
/// Implementations must be immutable after construction: `predict` takes
/// `&self` and is called concurrently from every request.
pub trait Regressor: Send + Sync {
    /// Predict a trip duration in seconds
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;

    /// Number of input columns the estimator was fit on
    fn input_arity(&self) -> usize;

    /// Short backend name, e.g. `"onnx"`
    fn kind(&self) -> &'static str;

    /// Version string embedded in the artifact, if any
    fn version(&self) -> Option<&str> {
        None
    }
}
