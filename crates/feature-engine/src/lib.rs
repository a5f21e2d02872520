//! Feature Engineering Engine
//!
//! Derives the distance, bearing and calendar features a trip duration
//! estimator was fit on, and assembles them into the fixed-order vector the
//! estimator expects.

mod error;
mod features;
pub mod geo;
mod record;
pub mod temporal;

pub use error::FeatureError;
pub use features::{
    FeatureExtractor, FeatureVector, FEATURE_DIMENSION, FEATURE_NAMES, FEATURE_SCHEMA_VERSION,
};
pub use geo::{bearing_degrees, haversine_distance, manhattan_proxy_distance, EARTH_RADIUS_KM};
pub use record::TripRecord;
pub use temporal::{TemporalFeatures, PICKUP_DT_EPOCH_UNIX};
