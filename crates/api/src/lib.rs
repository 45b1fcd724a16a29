//! Drowsiness Analysis API Server
//!
//! Stateless single-image EAR analysis over HTTP, plus health, Prometheus
//! metrics, and the static UI bundle.

use anyhow::{anyhow, Context};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use dms::{load_landmark_source, DmsConfig, DmsError, LandmarkSource};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;

use crate::config::{AppConfig, LogFormat, LoggingConfig, ServerConfig};
use crate::rate_limit::create_governor_config;

/// Application state shared across handlers
pub struct AppState {
    /// Loaded landmark model; `None` until one is configured
    pub landmarks: Option<Arc<dyn LandmarkSource>>,
    /// Thresholds applied to every request
    pub dms: DmsConfig,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus handle, if the exporter is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(landmarks: Option<Arc<dyn LandmarkSource>>, dms: DmsConfig) -> Self {
        Self {
            landmarks,
            dms,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/analyze", post(routes::analyze::analyze))
        .route("/api/v1/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics));

    // Everything else is the single-page UI
    if let Some(dir) = &server.static_dir {
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        router = router.fallback_service(spa);
    }

    router = router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(server.max_upload_bytes)),
    );

    if server.rate_limit.enabled {
        match create_governor_config(&server.rate_limit) {
            Some(config) => router = router.layer(GovernorLayer { config }),
            None => warn!("Rate limit quota is zero; rate limiting disabled"),
        }
    }

    router.with_state(state)
}

/// Initialize logging: stdout, plus the log file when one is configured.
///
/// `RUST_LOG` wins over the configured level. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = match config.format {
        LogFormat::Json => fmt::layer().with_target(true).json().boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
    };

    let file_layer = match &config.file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(log_file_appender(path)?)
                .with_ansi(false)
                .with_target(true),
        ),
        None => None,
    };

    let result = Registry::default()
        .with(stdout_layer)
        .with(file_layer)
        .with(filter)
        .try_init();

    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
    Ok(())
}

/// Append-only writer for a single, never-rotated log file
fn log_file_appender(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics exporter not installed: {}", e);
            None
        }
    }
}

/// Validate the detection settings and load the landmark model.
///
/// Bad thresholds are fatal. A missing model is not: /analyze answers 503
/// until the server is restarted with one.
pub fn build_state(dms: &DmsConfig) -> Result<AppState, DmsError> {
    dms.validate()?;

    let landmarks = match load_landmark_source(dms) {
        Ok(Some(source)) => {
            info!("Landmark model ready: {}", source.name());
            Some(source)
        }
        Ok(None) => {
            warn!("No landmark model configured; /analyze will return 503");
            None
        }
        Err(e) => {
            error!("Error loading landmark model: {}", e);
            None
        }
    };

    Ok(AppState::new(landmarks, dms.clone()))
}

/// Run the server until Ctrl-C
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let mut state = build_state(&config.dms)?;
    if let Some(handle) = install_metrics() {
        state = state.with_metrics(handle);
    }

    let app = create_router(Arc::new(state), &config.server);
    let addr = config.server.bind_addr();

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use dms::StaticLandmarks;
    use serde_json::Value;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_health_ready() {
        let state = AppState::new(Some(Arc::new(StaticLandmarks::with_ear(0.3))), DmsConfig::default());
        let app = create_router(Arc::new(state), &ServerConfig::default());

        let response = app.oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model"]["ready"], true);
        assert_eq!(body["model"]["name"], "static");
        assert_eq!(body["detection"]["consec_frames"], 45);
    }

    #[tokio::test]
    async fn test_health_degraded_without_model() {
        let app = create_router(Arc::new(AppState::new(None, DmsConfig::default())), &ServerConfig::default());

        let body: Value =
            serde_json::from_slice(&body_bytes(app.oneshot(get("/api/v1/health")).await.unwrap()).await).unwrap();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["model"]["ready"], false);
        assert!(body["model"]["name"].is_null());
    }

    #[test]
    fn test_build_state_rejects_bad_detection_settings() {
        let bad = [
            DmsConfig { ear_threshold: -1.0, ..Default::default() },
            DmsConfig { ear_threshold: f32::NAN, ..Default::default() },
            DmsConfig { consec_frames: 0, ..Default::default() },
            DmsConfig { min_face_confidence: 1.5, ..Default::default() },
        ];
        for dms in &bad {
            assert!(matches!(build_state(dms), Err(DmsError::Config(_))), "{:?}", dms);
        }
    }

    #[test]
    fn test_build_state_without_model_is_degraded() {
        let state = build_state(&DmsConfig::default()).unwrap();
        assert!(state.landmarks.is_none());
        assert_eq!(state.dms.consec_frames, 45);
    }

    #[test]
    fn test_log_file_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drowsiness_detector.log");
        let config = LoggingConfig {
            file: Some(path.clone()),
            ..Default::default()
        };

        init_logging(&config).unwrap();
        warn!("eyes closed for 45 frames");

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("eyes closed for 45 frames"));
    }

    #[test]
    fn test_log_file_needs_a_file_name() {
        let config = LoggingConfig {
            file: Some(PathBuf::from("/")),
            ..Default::default()
        };
        assert!(init_logging(&config).is_err());
    }

    #[tokio::test]
    async fn test_metrics_without_exporter() {
        let app = create_router(Arc::new(AppState::new(None, DmsConfig::default())), &ServerConfig::default());
        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_fallback_serves_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>monitor</html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

        let server = ServerConfig {
            static_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let app = create_router(Arc::new(AppState::new(None, DmsConfig::default())), &server);

        let response = app.clone().oneshot(get("/app.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"console.log(1)");

        let response = app.oneshot(get("/history/today")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"<html>monitor</html>");
    }

    #[tokio::test]
    async fn test_unknown_path_without_static_dir() {
        let app = create_router(Arc::new(AppState::new(None, DmsConfig::default())), &ServerConfig::default());
        let response = app.oneshot(get("/nowhere")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
