//! Prediction Request Orchestration

use crate::error::ServiceError;
use crate::format::{format_duration, round_seconds};
use data_validator::{RawRequest, ValidationConfig, Validator};
use feature_engine::FeatureExtractor;
use inference_engine::ModelHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Return internal error text to callers (debug deployments only)
    pub expose_error_detail: bool,
    /// Longest input summary written to the request log
    pub log_input_chars: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            expose_error_detail: false,
            log_input_chars: 256,
        }
    }
}

/// Outcome of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Id carried by this request's span and log event
    pub request_id: Uuid,
    /// Estimated trip duration in whole seconds
    pub duration_seconds: u64,
    /// `"<m> minutes and <s> seconds"`
    pub formatted_time: String,
    /// Wall-clock time spent inside the model
    pub prediction_time_ms: f64,
    /// Wall-clock time for the whole request
    pub processing_time_ms: f64,
}

/// Orchestrates validate → featurize → infer → format for each request.
///
/// Holds no per-request mutable state; clone the `Arc` around it freely.
pub struct PredictionService {
    model: Arc<ModelHandle>,
    validator: Validator,
    extractor: FeatureExtractor,
    config: ServiceConfig,
}

impl PredictionService {
    pub fn new(model: Arc<ModelHandle>, validation: ValidationConfig, config: ServiceConfig) -> Self {
        info!("Creating prediction service with config: {:?}", config);
        Self {
            model,
            validator: Validator::new(validation),
            extractor: FeatureExtractor::new(),
            config,
        }
    }

    /// Shared model handle
    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Serve one prediction request and write its log record
    pub fn predict(&self, raw: &RawRequest) -> Result<PredictionResult, ServiceError> {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let span = info_span!("prediction", %request_id);
        let _entered = span.enter();

        let outcome = self.run(raw, request_id, started);
        self.record(raw, request_id, &outcome, started);
        outcome
    }

    fn run(
        &self,
        raw: &RawRequest,
        request_id: Uuid,
        started: Instant,
    ) -> Result<PredictionResult, ServiceError> {
        let record = self.validator.validate(raw)?;
        let features = self.extractor.extract(&record)?;

        let inference_start = Instant::now();
        let estimate = self.model.predict(&features)?;
        let prediction_time_ms = inference_start.elapsed().as_secs_f64() * 1000.0;

        let duration_seconds = round_seconds(estimate);
        Ok(PredictionResult {
            request_id,
            duration_seconds,
            formatted_time: format_duration(duration_seconds),
            prediction_time_ms,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    fn record(
        &self,
        raw: &RawRequest,
        request_id: Uuid,
        outcome: &Result<PredictionResult, ServiceError>,
        started: Instant,
    ) {
        let input = self.summarize(raw);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(result) => {
                info!(
                    target: "prediction_service::request",
                    %request_id,
                    %input,
                    outcome = "ok",
                    duration_seconds = result.duration_seconds,
                    prediction_time_ms = result.prediction_time_ms,
                    processing_time_ms = result.processing_time_ms,
                    "prediction served"
                );
                metrics::histogram!("prediction_latency_ms").record(result.processing_time_ms);
            }
            Err(ServiceError::Validation(errors)) => {
                info!(
                    target: "prediction_service::request",
                    %request_id,
                    %input,
                    outcome = "invalid",
                    detail = %errors,
                    elapsed_ms,
                    "prediction rejected"
                );
            }
            Err(ServiceError::ModelUnavailable(state)) => {
                warn!(
                    target: "prediction_service::request",
                    %request_id,
                    %input,
                    outcome = "unavailable",
                    %state,
                    elapsed_ms,
                    "prediction refused"
                );
            }
            Err(err) => {
                error!(
                    target: "prediction_service::request",
                    %request_id,
                    %input,
                    outcome = "error",
                    error = %err,
                    elapsed_ms,
                    "prediction failed"
                );
            }
        }

        let label = match outcome {
            Ok(_) => "ok",
            Err(ServiceError::Validation(_)) => "invalid",
            Err(ServiceError::ModelUnavailable(_)) => "unavailable",
            Err(_) => "error",
        };
        metrics::counter!("predictions_total", "outcome" => label).increment(1);
    }

    fn summarize(&self, raw: &RawRequest) -> String {
        let text = serde_json::to_string(raw).unwrap_or_default();
        let limit = self.config.log_input_chars;
        if text.chars().count() > limit {
            let mut cut: String = text.chars().take(limit).collect();
            cut.push_str("...");
            cut
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use feature_engine::{FeatureVector, FEATURE_DIMENSION};
    use inference_engine::{InferenceError, LinearRegressor, ModelConfig, ModelState, Regressor};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reference_request() -> RawRequest {
        match json!({
            "vendor_id": 1,
            "passenger_count": 1,
            "pickup_datetime": "2023-05-16T12:00:00",
            "pickup_longitude": -73.9812,
            "pickup_latitude": 40.7648,
            "dropoff_longitude": -73.9708,
            "dropoff_latitude": 40.7617
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    /// 300 s base plus 150 s per haversine km
    fn distance_model() -> LinearRegressor {
        let mut coefficients = vec![0.0; FEATURE_DIMENSION];
        coefficients[7] = 150.0;
        LinearRegressor::new(300.0, coefficients)
    }

    fn service_with<R: Regressor + 'static>(regressor: R) -> PredictionService {
        let handle = ModelHandle::with_regressor(regressor).unwrap();
        PredictionService::new(
            Arc::new(handle),
            ValidationConfig::default(),
            ServiceConfig::default(),
        )
    }

    struct Counting(Arc<AtomicUsize>);

    impl Regressor for Counting {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(61.0)
        }
        fn input_arity(&self) -> usize {
            FEATURE_DIMENSION
        }
        fn kind(&self) -> &'static str {
            "counting"
        }
    }

    struct Broken;

    impl Regressor for Broken {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
            Err(InferenceError::InferenceFailed("tree 3 is corrupt".to_string()))
        }
        fn input_arity(&self) -> usize {
            FEATURE_DIMENSION
        }
        fn kind(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_reference_prediction() {
        let service = service_with(distance_model());
        let result = service.predict(&reference_request()).unwrap();

        // 300 + 150 * 0.9413 km
        assert_eq!(result.duration_seconds, 441);
        assert_eq!(result.formatted_time, "7 minutes and 21 seconds");
        assert!(result.prediction_time_ms >= 0.0);
        assert!(result.processing_time_ms >= result.prediction_time_ms);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let service = service_with(distance_model());
        let first = service.predict(&reference_request()).unwrap();
        for _ in 0..25 {
            let next = service.predict(&reference_request()).unwrap();
            assert_eq!(next.duration_seconds, first.duration_seconds);
            assert_eq!(next.formatted_time, first.formatted_time);
            assert_ne!(next.request_id, first.request_id);
        }
    }

    #[test]
    fn test_invalid_input_skips_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(Counting(Arc::clone(&calls)));

        let mut raw = reference_request();
        raw.remove("dropoff_latitude");
        let err = service.predict(&raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.fields(), vec!["dropoff_latitude"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let result = service.predict(&reference_request()).unwrap();
        assert_eq!(result.formatted_time, "1 minutes and 1 seconds");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_model_not_loaded() {
        let handle = Arc::new(ModelHandle::new(ModelConfig::default()));
        let service =
            PredictionService::new(handle, ValidationConfig::default(), ServiceConfig::default());
        let err = service.predict(&reference_request()).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::ModelUnavailable(ModelState::NotStarted)
        ));
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_inference_failure_is_request_scoped() {
        let service = service_with(Broken);
        let err = service.predict(&reference_request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        // The handle is still serving
        assert!(service.model().is_ready());
    }

    #[test]
    fn test_negative_estimate_clamped() {
        let service = service_with(LinearRegressor::new(-50.0, vec![0.0; FEATURE_DIMENSION]));
        let result = service.predict(&reference_request()).unwrap();
        assert_eq!(result.duration_seconds, 0);
        assert_eq!(result.formatted_time, "0 minutes and 0 seconds");
    }

    #[test]
    fn test_input_summary_is_truncated() {
        let handle = Arc::new(ModelHandle::with_regressor(distance_model()).unwrap());
        let service = PredictionService::new(
            handle,
            ValidationConfig::default(),
            ServiceConfig {
                log_input_chars: 10,
                ..Default::default()
            },
        );
        let summary = service.summarize(&reference_request());
        assert_eq!(summary.chars().count(), 13);
        assert!(summary.ends_with("..."));
    }
}
