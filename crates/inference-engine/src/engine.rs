//! Model Handle and Lifecycle

use crate::linear::LinearRegressor;
use crate::onnx::OnnxRegressor;
use crate::regressor::Regressor;
use crate::schema::SchemaManifest;
use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION, FEATURE_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Lifecycle of the process-wide model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// Handle created, load not requested yet
    NotStarted,
    /// Artifact is being read and validated
    Loading,
    /// Accepting predictions
    Ready,
    /// Load failed; terminal
    Failed,
    /// Process is stopping
    ShuttingDown,
}

impl ModelState {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::NotStarted => "not_started",
            ModelState::Loading => "loading",
            ModelState::Ready => "ready",
            ModelState::Failed => "failed",
            ModelState::ShuttingDown => "shutting_down",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ModelState::NotStarted,
            1 => ModelState::Loading,
            2 => ModelState::Ready,
            3 => ModelState::Failed,
            _ => ModelState::ShuttingDown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ModelState::NotStarted => 0,
            ModelState::Loading => 1,
            ModelState::Ready => 2,
            ModelState::Failed => 3,
            ModelState::ShuttingDown => 4,
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Onnx,
    Linear,
}

impl ModelFormat {
    /// Guess from the file extension: `.json` is linear, anything else ONNX
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ModelFormat::Linear,
            _ => ModelFormat::Onnx,
        }
    }
}

/// Where to find the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Artifact path
    pub path: PathBuf,
    /// Optional feature schema manifest checked at load
    pub schema_path: Option<PathBuf>,
    /// Override the format inferred from the extension
    pub format: Option<ModelFormat>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/model.onnx"),
            schema_path: None,
            format: None,
        }
    }
}

/// Identity of the loaded model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Backend name
    pub kind: String,
    /// Model version from the manifest or the artifact
    pub version: String,
    /// Artifact location
    pub path: String,
    /// Feature schema the model was checked against
    pub schema_version: String,
    /// Unix seconds when loading finished
    pub loaded_at: u64,
}

struct LoadedModel {
    regressor: Box<dyn Regressor>,
    info: ModelInfo,
}

/// Process-wide, read-only model handle.
///
/// Share it as `Arc<ModelHandle>`. The state is an atomic and the model is
/// set exactly once, so `predict` never takes a lock.
pub struct ModelHandle {
    config: ModelConfig,
    state: AtomicU8,
    model: OnceLock<LoadedModel>,
}

impl ModelHandle {
    /// Create a handle in `NotStarted`
    pub fn new(config: ModelConfig) -> Self {
        info!("Creating model handle for {}", config.path.display());
        Self {
            config,
            state: AtomicU8::new(ModelState::NotStarted.as_u8()),
            model: OnceLock::new(),
        }
    }

    /// Create a handle that is already `Ready` with the given estimator
    pub fn with_regressor<R: Regressor + 'static>(regressor: R) -> Result<Self, InferenceError> {
        let handle = Self::new(ModelConfig {
            path: PathBuf::from("<in-memory>"),
            ..Default::default()
        });
        handle.begin_load()?;
        match handle.install(Box::new(regressor), None) {
            Ok(()) => Ok(handle),
            Err(e) => {
                handle.fail_load();
                Err(e)
            }
        }
    }

    /// Load the configured artifact.
    ///
    /// Only valid from `NotStarted`. Failure moves the handle to the terminal
    /// `Failed` state; there is no retry.
    pub fn load(&self) -> Result<(), InferenceError> {
        self.begin_load()?;
        self.finish_load()
    }

    /// Move `NotStarted` to `Loading` without touching the artifact yet
    pub fn begin_load(&self) -> Result<(), InferenceError> {
        self.transition(ModelState::NotStarted, ModelState::Loading)
            .map_err(|current| {
                InferenceError::ModelLoadError(format!("load requested in state {}", current))
            })
    }

    /// Open and install the artifact. The handle must be `Loading`.
    pub fn finish_load(&self) -> Result<(), InferenceError> {
        let state = self.state();
        if state != ModelState::Loading {
            return Err(InferenceError::ModelLoadError(format!(
                "artifact opened in state {}",
                state
            )));
        }

        let result = self.open_artifact().and_then(|(regressor, manifest)| {
            self.install(regressor, manifest)
        });
        if let Err(e) = &result {
            error!("Model load failed for {}: {}", self.config.path.display(), e);
            self.fail_load();
        }
        result
    }

    /// Run inference on a feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let state = self.state();
        if state != ModelState::Ready {
            return Err(InferenceError::ModelUnavailable(state));
        }
        let loaded = self
            .model
            .get()
            .ok_or(InferenceError::ModelUnavailable(state))?;

        let y = loaded.regressor.predict(features)?;
        if !y.is_finite() {
            return Err(InferenceError::InferenceFailed(format!(
                "model returned non-finite value {}",
                y
            )));
        }
        Ok(y)
    }

    /// Stop accepting predictions. `Failed` stays `Failed`.
    pub fn shutdown(&self) {
        let result = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                match ModelState::from_u8(raw) {
                    ModelState::NotStarted | ModelState::Loading | ModelState::Ready => {
                        Some(ModelState::ShuttingDown.as_u8())
                    }
                    ModelState::Failed | ModelState::ShuttingDown => None,
                }
            });
        match result {
            Ok(previous) => info!(
                "Model handle shutting down (was {})",
                ModelState::from_u8(previous)
            ),
            Err(current) => debug!(
                "Shutdown ignored in state {}",
                ModelState::from_u8(current)
            ),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModelState {
        ModelState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if the model is ready for predictions
    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Ready
    }

    /// Identity of the loaded model, once loaded
    pub fn info(&self) -> Option<&ModelInfo> {
        self.model.get().map(|loaded| &loaded.info)
    }

    /// Get model path
    pub fn model_path(&self) -> &Path {
        &self.config.path
    }

    /// Compare-and-swap on the lifecycle; returns the actual state on failure
    fn transition(&self, from: ModelState, to: ModelState) -> Result<(), ModelState> {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(ModelState::from_u8)
    }

    /// `Loading` → `Failed`; a concurrent shutdown wins
    fn fail_load(&self) {
        if let Err(current) = self.transition(ModelState::Loading, ModelState::Failed) {
            warn!("Load failure not recorded, handle is {}", current);
        }
    }

    fn open_artifact(
        &self,
    ) -> Result<(Box<dyn Regressor>, Option<SchemaManifest>), InferenceError> {
        let manifest = match &self.config.schema_path {
            Some(path) => Some(SchemaManifest::load(path)?),
            None => {
                warn!("No feature schema manifest configured; checking arity only");
                None
            }
        };

        let path = &self.config.path;
        let format = self
            .config
            .format
            .unwrap_or_else(|| ModelFormat::from_path(path));
        debug!("Opening {:?} artifact {}", format, path.display());

        let regressor: Box<dyn Regressor> = match format {
            ModelFormat::Onnx => Box::new(OnnxRegressor::load(path)?),
            ModelFormat::Linear => Box::new(LinearRegressor::load(path)?),
        };
        Ok((regressor, manifest))
    }

    fn install(
        &self,
        regressor: Box<dyn Regressor>,
        manifest: Option<SchemaManifest>,
    ) -> Result<(), InferenceError> {
        if regressor.input_arity() != FEATURE_DIMENSION {
            return Err(InferenceError::SchemaMismatch {
                expected: format!("{} input features", FEATURE_DIMENSION),
                actual: format!("{} input features", regressor.input_arity()),
            });
        }
        if let Some(manifest) = &manifest {
            manifest.check()?;
        }

        let version = manifest
            .as_ref()
            .and_then(|m| m.model_version.clone())
            .or_else(|| regressor.version().map(str::to_string))
            .unwrap_or_else(|| "unversioned".to_string());
        let loaded_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let info = ModelInfo {
            kind: regressor.kind().to_string(),
            version,
            path: self.config.path.display().to_string(),
            schema_version: FEATURE_SCHEMA_VERSION.to_string(),
            loaded_at,
        };

        if self.model.set(LoadedModel { regressor, info }).is_err() {
            return Err(InferenceError::ModelLoadError(
                "model already installed".to_string(),
            ));
        }
        if let Err(current) = self.transition(ModelState::Loading, ModelState::Ready) {
            return Err(InferenceError::ModelLoadError(format!(
                "model loaded but handle moved to {}",
                current
            )));
        }
        info!("Model loaded successfully from {}", self.config.path.display());
        Ok(())
    }
}
