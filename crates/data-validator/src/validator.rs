//! Request Validator for Trip Predictions

use crate::datetime::parse_pickup_datetime;
use crate::error::{ValidationError, ValidationErrors};
use crate::RawRequest;
use chrono::NaiveDateTime;
use feature_engine::TripRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Vendor codes present in the training data
    pub known_vendor_ids: Vec<i64>,
    /// Latitude valid range (degrees)
    pub latitude_range: (f64, f64),
    /// Longitude valid range (degrees)
    pub longitude_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            known_vendor_ids: vec![1, 2],
            latitude_range: (-90.0, 90.0),
            longitude_range: (-180.0, 180.0),
        }
    }
}

/// Validator for raw prediction requests
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a raw request into a canonical trip record.
    ///
    /// Every field is checked even after a failure so the caller learns about
    /// all problems at once. `dropoff_datetime` is accepted and ignored.
    pub fn validate(&self, raw: &RawRequest) -> Result<TripRecord, ValidationErrors> {
        let mut errors = Vec::new();

        let vendor_id = keep(self.validate_vendor_id(raw), &mut errors);
        let passenger_count = keep(validate_passenger_count(raw), &mut errors);
        let pickup_datetime = keep(validate_pickup_datetime(raw), &mut errors);
        let pickup_longitude = keep(
            self.validate_coordinate(raw, "pickup_longitude", self.config.longitude_range),
            &mut errors,
        );
        let pickup_latitude = keep(
            self.validate_coordinate(raw, "pickup_latitude", self.config.latitude_range),
            &mut errors,
        );
        let dropoff_longitude = keep(
            self.validate_coordinate(raw, "dropoff_longitude", self.config.longitude_range),
            &mut errors,
        );
        let dropoff_latitude = keep(
            self.validate_coordinate(raw, "dropoff_latitude", self.config.latitude_range),
            &mut errors,
        );
        let store_and_fwd_flag = keep(validate_store_and_fwd_flag(raw), &mut errors);

        match (
            vendor_id,
            passenger_count,
            pickup_datetime,
            pickup_longitude,
            pickup_latitude,
            dropoff_longitude,
            dropoff_latitude,
            store_and_fwd_flag,
        ) {
            (
                Some(vendor_id),
                Some(passenger_count),
                Some(pickup_datetime),
                Some(pickup_longitude),
                Some(pickup_latitude),
                Some(dropoff_longitude),
                Some(dropoff_latitude),
                Some(store_and_fwd_flag),
            ) if errors.is_empty() => Ok(TripRecord {
                vendor_id,
                passenger_count,
                pickup_datetime,
                pickup_longitude,
                pickup_latitude,
                dropoff_longitude,
                dropoff_latitude,
                store_and_fwd_flag,
            }),
            _ => {
                debug!("Rejected request: {} invalid field(s)", errors.len());
                Err(ValidationErrors::new(errors))
            }
        }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    fn validate_vendor_id(&self, raw: &RawRequest) -> Result<i64, ValidationError> {
        let field = "vendor_id";
        let value = read_integer(raw, field)?;
        if self.config.known_vendor_ids.contains(&value) {
            Ok(value)
        } else {
            Err(ValidationError::UnknownCode {
                field,
                value,
                allowed: self.config.known_vendor_ids.clone(),
            })
        }
    }

    fn validate_coordinate(
        &self,
        raw: &RawRequest,
        field: &'static str,
        range: (f64, f64),
    ) -> Result<f64, ValidationError> {
        let value = read_float(raw, field)?;
        self.validate_range(field, value, range)?;
        Ok(value)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

fn keep<T>(result: Result<T, ValidationError>, errors: &mut Vec<ValidationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(err);
            None
        }
    }
}

fn validate_passenger_count(raw: &RawRequest) -> Result<u32, ValidationError> {
    let field = "passenger_count";
    let value = read_integer(raw, field)?;
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange {
        field,
        value: value as f64,
        min: 0.0,
        max: f64::from(u32::MAX),
    })
}

fn validate_pickup_datetime(raw: &RawRequest) -> Result<NaiveDateTime, ValidationError> {
    let field = "pickup_datetime";
    match require(raw, field)? {
        Value::String(s) => {
            parse_pickup_datetime(s).map_err(|reason| ValidationError::InvalidFormat { field, reason })
        }
        other => Err(type_error(field, "a date/time string", other)),
    }
}

/// Absent or null means 0; training data encodes the flag as `Y`/`N`.
fn validate_store_and_fwd_flag(raw: &RawRequest) -> Result<u8, ValidationError> {
    let field = "store_and_fwd_flag";
    let invalid = || ValidationError::InvalidFormat {
        field,
        reason: "expected 0, 1, \"Y\" or \"N\"".to_string(),
    };
    match raw.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(s)) => match s.trim() {
            "Y" | "y" | "1" => Ok(1),
            "N" | "n" | "0" | "" => Ok(0),
            _ => Err(invalid()),
        },
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            _ => Err(invalid()),
        },
        Some(Value::Bool(b)) => Ok(u8::from(*b)),
        Some(_) => Err(invalid()),
    }
}

fn require<'a>(raw: &'a RawRequest, field: &'static str) -> Result<&'a Value, ValidationError> {
    match raw.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

/// Integral JSON numbers (`1`, `1.0`) and numeric strings are accepted.
fn read_integer(raw: &RawRequest, field: &'static str) -> Result<i64, ValidationError> {
    let value = require(raw, field)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        other => return Err(type_error(field, "an integer", other)),
    };
    parsed.ok_or_else(|| ValidationError::InvalidFormat {
        field,
        reason: format!("expected an integer, got {}", summarize(value)),
    })
}

fn read_float(raw: &RawRequest, field: &'static str) -> Result<f64, ValidationError> {
    let value = require(raw, field)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => return Err(type_error(field, "a number", other)),
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::InvalidFormat {
            field,
            reason: format!("expected a finite number, got {}", summarize(value)),
        }),
    }
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(v as i64)
    } else {
        None
    }
}

fn type_error(field: &'static str, expected: &str, got: &Value) -> ValidationError {
    ValidationError::InvalidFormat {
        field,
        reason: format!("expected {}, got {}", expected, summarize(got)),
    }
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            let text = other.to_string();
            if text.chars().count() > 32 {
                format!("{}...", text.chars().take(32).collect::<String>())
            } else {
                text
            }
        }
    }
}
