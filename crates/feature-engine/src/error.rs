//! Feature Computation Error Types

use thiserror::Error;

/// Errors during feature computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// An input coordinate or a derived feature is NaN or infinite
    #[error("{field} is not finite: {value}")]
    NonFinite { field: &'static str, value: f64 },
}
