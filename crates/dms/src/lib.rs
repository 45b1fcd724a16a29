//! Driver Monitoring System (DMS)
//!
//! Eye-closure drowsiness detection from facial landmarks:
//! - Eye Aspect Ratio (EAR) from six landmarks per eye
//! - Consecutive-closed-frame debounce and alert state machine
//! - Landmark model seam (face-mesh ONNX behind the `onnx` feature)
//! - Detection sessions running the cooperative per-frame loop
//!
//! The HTTP server and the live monitor both go through this crate, so the
//! geometry and the thresholds live in one place.

pub mod analysis;
pub mod config;
pub mod detector;
pub mod ear;
pub mod landmarks;
pub mod session;
pub mod tracker;

pub use analysis::{evaluate_single, FrameAnalysis, SingleFrameVerdict};
pub use config::DmsConfig;
pub use detector::{load_landmark_source, LandmarkSource, ScriptedLandmarks, StaticLandmarks};
pub use ear::{average_ear, eye_aspect_ratio, DetectionFrame};
pub use landmarks::{EyeIndices, FaceLandmarks, Point2D, LEFT_EYE, RIGHT_EYE};
pub use session::{session_channel, DetectionSession, SessionCommand, SessionHandle, SessionSummary};
pub use tracker::{DrowsinessTracker, TrackerPhase, TrackerState, TrackerUpdate};

#[cfg(feature = "onnx")]
pub use detector::FaceMeshOnnx;

use camera_capture::CameraError;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Frame source failed: {0}")]
    FrameSource(#[from] CameraError),

    #[error("Detection session is not running")]
    NotRunning,
}
