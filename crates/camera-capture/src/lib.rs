//! Camera Capture Library for the Drowsiness Monitor
//!
//! Turns camera output or uploaded stills into RGB frames:
//! - `VideoFrame` decoding from encoded image bytes (PNG, JPEG, ...)
//! - `FrameSource` trait for paced, cancellable frame delivery
//! - Image-sequence playback and channel-fed sources

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{ChannelFrameSource, FrameSource, ImageSequenceSource};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open frame source: {0}")]
    Open(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Frame source released")]
    Released,
}

/// Capture configuration for the live monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Directory holding the stills to play back
    pub directory: PathBuf,
    /// Target FPS
    pub fps: u32,
    /// Restart from the first still once the sequence is exhausted
    pub looped: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("frames"),
            fps: 30,
            looped: false,
        }
    }
}

impl CaptureConfig {
    /// Create config for a frame directory at the nominal 30 fps
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            directory: path.into(),
            ..Default::default()
        }
    }
}
