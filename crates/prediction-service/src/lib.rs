//! Trip Duration Prediction Service
//!
//! Runs one request through validation, feature extraction and inference,
//! and shapes the outcome into a [`PredictionResult`] or a [`ServiceError`].

mod error;
mod format;
mod service;

pub use error::{ErrorKind, ServiceError};
pub use format::{format_duration, round_seconds};
pub use service::{PredictionResult, PredictionService, ServiceConfig};
