//! Layered Service Configuration
//!
//! Built-in defaults, then an optional TOML/YAML/JSON file, then `TRIP_`
//! environment variables with `__` between nested keys, for example
//! `TRIP_MODEL__PATH=/srv/models/rf.onnx`.

use config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use inference_engine::ModelConfig;
use prediction_service::ServiceConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "TRIP_CONFIG";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// Install the Prometheus recorder and expose `/metrics/prometheus`
    pub prometheus: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            prometheus: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub service: ServiceConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load from `$TRIP_CONFIG` (or `config/default.*` if present) and the
    /// environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        Self::load_from(path.as_deref())
    }

    /// Load with an explicit file. A named file must exist.
    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name("config/default").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("TRIP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("validation.known_vendor_ids")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(settings.model.path, PathBuf::from("models/model.onnx"));
        assert!(!settings.service.expose_error_detail);
        assert_eq!(settings.validation.known_vendor_ids, vec![1, 2]);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("trip-settings-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
[server]
bind_addr = "127.0.0.1:9000"

[model]
path = "/srv/models/rf.json"
format = "linear"

[service]
expose_error_detail = true

[validation]
known_vendor_ids = [1, 2, 3]
"#,
        )
        .unwrap();

        let settings = Settings::load_from(path.to_str()).unwrap();
        assert_eq!(settings.server.bind_addr, "127.0.0.1:9000");
        assert!(settings.server.prometheus);
        assert_eq!(settings.model.path, PathBuf::from("/srv/models/rf.json"));
        assert!(settings.service.expose_error_detail);
        assert_eq!(settings.service.log_input_chars, 256);
        assert_eq!(settings.validation.known_vendor_ids, vec![1, 2, 3]);
        assert_eq!(settings.validation.latitude_range, (-90.0, 90.0));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_named_file_is_error() {
        assert!(Settings::load_from(Some("/nonexistent/trip-settings.toml")).is_err());
    }
}
