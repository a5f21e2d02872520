//! Validation Error Types

use std::fmt;
use thiserror::Error;

/// A single offending field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Integer outside the set of known codes
    #[error("{field} value {value} is not one of {allowed:?}")]
    UnknownCode {
        field: &'static str,
        value: i64,
        allowed: Vec<i64>,
    },

    /// Wrong type or unparsable value
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::OutOfRange { field, .. }
            | ValidationError::UnknownCode { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
            ValidationError::MissingField(field) => field,
        }
    }
}

/// Every field that failed validation for one request
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// Individual failures, in field order
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Names of the failing fields
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(ValidationError::field).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(err: ValidationError) -> Self {
        Self::new(vec![err])
    }
}
