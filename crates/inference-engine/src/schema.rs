//! Feature Schema Manifest
//!
//! Optional sidecar written next to the model artifact at training time,
//! listing the columns the estimator was fit on.

use crate::InferenceError;
use feature_engine::{FEATURE_NAMES, FEATURE_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// `{ "schema_version": "...", "model_version": "...", "features": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaManifest {
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    pub features: Vec<String>,
}

impl SchemaManifest {
    /// Manifest describing the feature schema compiled into this binary
    pub fn current() -> Self {
        Self {
            schema_version: Some(FEATURE_SCHEMA_VERSION.to_string()),
            model_version: None,
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let data = fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("schema {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            InferenceError::ModelLoadError(format!("schema {}: {}", path.display(), e))
        })
    }

    /// Check names, order and version against the compiled schema
    pub fn check(&self) -> Result<(), InferenceError> {
        if let Some(version) = &self.schema_version {
            if version != FEATURE_SCHEMA_VERSION {
                return Err(InferenceError::SchemaMismatch {
                    expected: FEATURE_SCHEMA_VERSION.to_string(),
                    actual: version.clone(),
                });
            }
        }
        if self.features.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) {
            return Err(InferenceError::SchemaMismatch {
                expected: FEATURE_NAMES.join(","),
                actual: self.features.join(","),
            });
        }
        Ok(())
    }
}
