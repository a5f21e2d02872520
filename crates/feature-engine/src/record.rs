//! Canonical Trip Record

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Validated, typed and defaulted trip request.
///
/// Built by the request validator; the feature extractor assumes every
/// coordinate is finite and in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Vendor code (1 or 2 in the training data)
    pub vendor_id: i64,
    /// Number of passengers
    pub passenger_count: u32,
    /// Pickup wall-clock time
    pub pickup_datetime: NaiveDateTime,
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_latitude: f64,
    /// Store-and-forward flag, 0 unless the caller says otherwise
    #[serde(default)]
    pub store_and_fwd_flag: u8,
}
