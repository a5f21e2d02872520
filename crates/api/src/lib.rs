//! Trip Duration API Server
//!
//! HTTP surface for the prediction service: `/predict`, `/health`,
//! `/metrics` and `/metrics/prometheus`.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use inference_engine::{ModelHandle, ModelState};
use metrics_exporter_prometheus::PrometheusHandle;
use prediction_service::PredictionService;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
mod routes;

pub use config::{LoggingConfig, ServerConfig, Settings};
pub use error::{ApiError, ErrorBody};

/// Application state shared across handlers
pub struct AppState {
    /// Prediction pipeline, owns the model handle
    pub service: PredictionService,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus renderer, if the recorder was installed
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(service: PredictionService, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            service,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            prometheus,
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub state: ModelState,
    pub timestamp: u64,
    pub version: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(routes::predict::predict))
        .route("/health", get(health_handler))
        .route("/metrics", get(routes::metrics::get_metrics))
        .route("/metrics/prometheus", get(routes::metrics::get_prometheus))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler; 200 only while the model is `Ready`
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let model_state = state.service.model().state();
    let ready = model_state == ModelState::Ready;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let response = HealthResponse {
        status: if ready { "healthy" } else { "unhealthy" },
        model_loaded: ready,
        state: model_state,
        timestamp,
        version: state.version.clone(),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Initialize logging
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Serve until Ctrl-C, then move the model to `ShuttingDown`
pub async fn run_server(
    settings: Settings,
    model: Arc<ModelHandle>,
    prometheus: Option<PrometheusHandle>,
) -> std::io::Result<()> {
    let service = PredictionService::new(
        Arc::clone(&model),
        settings.validation.clone(),
        settings.service.clone(),
    );
    let state = Arc::new(AppState::new(service, prometheus));
    let app = create_router(state);

    let addr = &settings.server.bind_addr;
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(model))
        .await
}

async fn shutdown_signal(model: Arc<ModelHandle>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    model.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use data_validator::ValidationConfig;
    use feature_engine::{FeatureVector, FEATURE_DIMENSION};
    use inference_engine::{InferenceError, LinearRegressor, ModelConfig, Regressor};
    use prediction_service::ServiceConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Broken;

    impl Regressor for Broken {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, InferenceError> {
            Err(InferenceError::InferenceFailed("leaf index 4242 out of bounds".to_string()))
        }
        fn input_arity(&self) -> usize {
            FEATURE_DIMENSION
        }
        fn kind(&self) -> &'static str {
            "broken"
        }
    }

    fn distance_model() -> LinearRegressor {
        let mut coefficients = vec![0.0; FEATURE_DIMENSION];
        coefficients[7] = 150.0;
        LinearRegressor {
            version: Some("lr-distance".to_string()),
            intercept: 300.0,
            coefficients,
        }
    }

    fn app_with(handle: ModelHandle, service_config: ServiceConfig) -> Router {
        let service = PredictionService::new(
            Arc::new(handle),
            ValidationConfig::default(),
            service_config,
        );
        create_router(Arc::new(AppState::new(service, None)))
    }

    fn ready_app() -> Router {
        app_with(
            ModelHandle::with_regressor(distance_model()).unwrap(),
            ServiceConfig::default(),
        )
    }

    fn reference_body() -> Value {
        json!({
            "vendor_id": 1,
            "passenger_count": 1,
            "pickup_datetime": "2023-05-16T12:00:00",
            "pickup_longitude": -73.9812,
            "pickup_latitude": 40.7648,
            "dropoff_longitude": -73.9708,
            "dropoff_latitude": 40.7617
        })
    }

    async fn post_predict(app: Router, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        send(app, request).await
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(app, request).await
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_reference_prediction() {
        let (status, body) = post_predict(ready_app(), reference_body().to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["prediction"].is_u64());
        assert_eq!(body["prediction"], 441);
        assert_eq!(body["formatted_time"], "7 minutes and 21 seconds");
        assert!(body["prediction_time_ms"].as_f64().unwrap() >= 0.0);
        assert!(body["processing_time_ms"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_prediction_carries_request_id() {
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(reference_body().to_string()))
            .unwrap();
        let response = ready_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let id = response
            .headers()
            .get(routes::predict::REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }

    #[tokio::test]
    async fn test_missing_field_is_400() {
        let mut body = reference_body();
        body.as_object_mut().unwrap().remove("passenger_count");
        let (status, body) = post_predict(ready_app(), body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input data");
        assert!(body["detail"].as_str().unwrap().contains("passenger_count"));
        assert_eq!(body["fields"], json!(["passenger_count"]));
    }

    #[tokio::test]
    async fn test_out_of_range_latitude_is_400() {
        let mut body = reference_body();
        body["pickup_latitude"] = json!(91.5);
        let (status, body) = post_predict(ready_app(), body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"], json!(["pickup_latitude"]));
    }

    #[tokio::test]
    async fn test_datetime_without_separator_is_400() {
        let mut body = reference_body();
        body["pickup_datetime"] = json!("20230516120000");
        let (status, body) = post_predict(ready_app(), body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"], json!(["pickup_datetime"]));
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_400() {
        let (status, body) = post_predict(ready_app(), "{\"vendor_id\": ".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input data");

        let (status, _) = post_predict(ready_app(), "[1, 2, 3]".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inference_failure_hides_detail() {
        let app = app_with(
            ModelHandle::with_regressor(Broken).unwrap(),
            ServiceConfig::default(),
        );
        let (status, body) = post_predict(app, reference_body().to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Prediction failed");
        assert!(!body["detail"].as_str().unwrap().contains("leaf index"));
    }

    #[tokio::test]
    async fn test_inference_failure_detail_in_debug_mode() {
        let app = app_with(
            ModelHandle::with_regressor(Broken).unwrap(),
            ServiceConfig {
                expose_error_detail: true,
                ..Default::default()
            },
        );
        let (status, body) = post_predict(app, reference_body().to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("leaf index"));
    }

    #[tokio::test]
    async fn test_health_before_and_after_load() {
        let unloaded = || app_with(ModelHandle::new(ModelConfig::default()), ServiceConfig::default());

        let (status, body) = get_json(unloaded(), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["state"], "not_started");
        assert_eq!(body["status"], "unhealthy");

        let (status, body) = post_predict(unloaded(), reference_body().to_string()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Model unavailable");

        let (status, body) = get_json(ready_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["state"], "ready");
    }

    #[tokio::test]
    async fn test_health_and_predict_while_loading() {
        let loading = || {
            let handle = ModelHandle::new(ModelConfig::default());
            handle.begin_load().unwrap();
            app_with(handle, ServiceConfig::default())
        };

        let (status, body) = get_json(loading(), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["state"], "loading");

        let (status, body) = post_predict(loading(), reference_body().to_string()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "model state is loading");
    }

    #[tokio::test]
    async fn test_health_after_failed_load() {
        let handle = ModelHandle::new(ModelConfig {
            path: "/nonexistent/model.json".into(),
            ..Default::default()
        });
        assert!(handle.load().is_err());
        let (status, body) = get_json(app_with(handle, ServiceConfig::default()), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["state"], "failed");
    }

    #[tokio::test]
    async fn test_metrics_surface() {
        let (status, body) = get_json(ready_app(), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "operational");
        assert_eq!(body["model_state"], "ready");
        assert_eq!(body["model"]["kind"], "linear");
        assert_eq!(body["model"]["version"], "lr-distance");
        assert_eq!(body["feature_schema"]["dimension"], FEATURE_DIMENSION);
        assert!(body["uptime_seconds"].is_u64());
    }

    #[tokio::test]
    async fn test_prometheus_disabled() {
        let request = Request::builder()
            .uri("/metrics/prometheus")
            .body(Body::empty())
            .unwrap();
        let response = ready_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
