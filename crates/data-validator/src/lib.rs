//! Request Validation
//!
//! Turns an untyped request body into a [`feature_engine::TripRecord`],
//! reporting every offending field at once.

mod datetime;
mod error;
mod validator;

pub use datetime::parse_pickup_datetime;
pub use error::{ValidationError, ValidationErrors};
pub use validator::{ValidationConfig, Validator};

/// Untyped field map as received from a caller
pub type RawRequest = serde_json::Map<String, serde_json::Value>;
