//! Application configuration
//!
//! Layered with the `config` crate, lowest priority first:
//! 1. Built-in defaults
//! 2. `drowsiness.toml` in the working directory (or an explicit file)
//! 3. `DROWSY_` environment variables, `__` between sections
//!    (e.g. `DROWSY_SERVER__PORT=8080`, `DROWSY_DMS__EAR_THRESHOLD=0.22`)

use std::path::{Path, PathBuf};

use camera_capture::CaptureConfig;
use config::{Config, ConfigError, Environment, File, Map};
use dms::DmsConfig;
use serde::Deserialize;

use crate::rate_limit::RateLimitConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DROWSY";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub dms: DmsConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Built single-page UI served for every non-API path
    pub static_dir: Option<PathBuf>,
    /// Largest accepted upload (bytes)
    pub max_upload_bytes: usize,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: None,
            max_upload_bytes: 10 * 1024 * 1024,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `dms=debug,info`
    pub level: String,
    pub format: LogFormat,
    /// Also append plain-text logs to this file, e.g. `drowsiness_detector.log`
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration; `path` replaces the optional `drowsiness.toml`
    /// and must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// `vars` stands in for the process environment when given
    fn load_with_env(path: Option<&Path>, vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("drowsiness").required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:5000");
        assert!(!config.server.rate_limit.enabled);
        assert_eq!(config.dms.ear_threshold, 0.25);
        assert_eq!(config.dms.consec_frames, 45);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drowsiness.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8080
static_dir = "dist"

[dms]
ear_threshold = 0.22
model_path = "models/face_mesh.onnx"

[capture]
fps = 15

[logging]
format = "json"
file = "logs/drowsiness_detector.log"
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("dist")));
        assert!((config.dms.ear_threshold - 0.22).abs() < 1e-6);
        assert_eq!(config.dms.consec_frames, 45);
        assert_eq!(config.dms.model_path.as_deref(), Some("models/face_mesh.onnx"));
        assert_eq!(config.capture.fps, 15);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.file, Some(PathBuf::from("logs/drowsiness_detector.log")));
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drowsiness.toml");
        std::fs::write(&path, "[server]\nport = 8080\n\n[dms]\nconsec_frames = 30\n").unwrap();

        let vars = Map::from([
            ("DROWSY_SERVER__PORT".to_string(), "8081".to_string()),
            ("DROWSY_DMS__CONSEC_FRAMES".to_string(), "10".to_string()),
            ("DROWSY_DMS__EAR_THRESHOLD".to_string(), "0.2".to_string()),
            ("DROWSY_LOGGING__FORMAT".to_string(), "json".to_string()),
            ("OTHER_SERVER__PORT".to_string(), "9999".to_string()),
        ]);

        let config = AppConfig::load_with_env(Some(&path), Some(vars)).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.dms.consec_frames, 10);
        assert!((config.dms.ear_threshold - 0.2).abs() < 1e-6);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
