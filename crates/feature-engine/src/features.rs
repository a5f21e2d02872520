//! Feature Vector Assembly

use crate::error::FeatureError;
use crate::geo::{bearing_degrees, haversine_distance, manhattan_proxy_distance};
use crate::record::TripRecord;
use crate::temporal::TemporalFeatures;
use serde::Serialize;
use tracing::debug;

/// Number of features in the vector
pub const FEATURE_DIMENSION: usize = 15;

/// Version tag of [`FEATURE_NAMES`]. Bump on any change to names or order.
pub const FEATURE_SCHEMA_VERSION: &str = "trip-features/v1";

/// Column order the estimator was fit on
pub const FEATURE_NAMES: [&str; FEATURE_DIMENSION] = [
    "vendor_id",
    "passenger_count",
    "pickup_longitude",
    "pickup_latitude",
    "dropoff_longitude",
    "dropoff_latitude",
    "store_and_fwd_flag",
    "distance_haversine",
    "distance_dummy_manhattan",
    "direction",
    "pickup_weekday",
    "pickup_hour",
    "pickup_minute",
    "pickup_dt",
    "pickup_week_hour",
];

/// Fixed-order feature vector for ML inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_DIMENSION],
}

impl FeatureVector {
    /// Wrap raw values that are already in [`FEATURE_NAMES`] order
    pub fn from_values(values: [f64; FEATURE_DIMENSION]) -> Self {
        Self { values }
    }

    /// Raw feature values
    pub fn values(&self) -> &[f64; FEATURE_DIMENSION] {
        &self.values
    }

    /// Values narrowed to `f32` for runtimes that take single precision
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }

    /// Look up a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.values[idx])
    }

    /// `(name, value)` pairs in schema order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

/// Turns canonical trip records into feature vectors
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector for one trip
    pub fn extract(&self, record: &TripRecord) -> Result<FeatureVector, FeatureError> {
        let coords = [
            ("pickup_latitude", record.pickup_latitude),
            ("pickup_longitude", record.pickup_longitude),
            ("dropoff_latitude", record.dropoff_latitude),
            ("dropoff_longitude", record.dropoff_longitude),
        ];
        for (field, value) in coords {
            check_finite(field, value)?;
        }

        let (lat1, lng1) = (record.pickup_latitude, record.pickup_longitude);
        let (lat2, lng2) = (record.dropoff_latitude, record.dropoff_longitude);

        let distance_haversine = haversine_distance(lat1, lng1, lat2, lng2);
        let distance_manhattan = manhattan_proxy_distance(lat1, lng1, lat2, lng2);
        let direction = bearing_degrees(lat1, lng1, lat2, lng2);
        let temporal = TemporalFeatures::from_pickup(&record.pickup_datetime);

        let values = [
            record.vendor_id as f64,
            f64::from(record.passenger_count),
            record.pickup_longitude,
            record.pickup_latitude,
            record.dropoff_longitude,
            record.dropoff_latitude,
            f64::from(record.store_and_fwd_flag),
            distance_haversine,
            distance_manhattan,
            direction,
            f64::from(temporal.weekday),
            f64::from(temporal.hour),
            f64::from(temporal.minute),
            temporal.dt_seconds,
            f64::from(temporal.week_hour),
        ];
        for (name, &value) in FEATURE_NAMES.iter().zip(values.iter()) {
            check_finite(name, value)?;
        }

        debug!(
            "Extracted features: haversine={:.3}km, manhattan={:.3}km, direction={:.1}, week_hour={}",
            distance_haversine, distance_manhattan, direction, temporal.week_hour
        );

        Ok(FeatureVector { values })
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), FeatureError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FeatureError::NonFinite { field, value })
    }
}
