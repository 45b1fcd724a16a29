//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::landmarks::{EyeIndices, LEFT_EYE, RIGHT_EYE};
use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// EAR below this counts as a closed-eye frame
    pub ear_threshold: f32,

    /// Consecutive closed-eye frames before the alert is raised
    /// (45 frames is about 1.5 s at 30 fps)
    pub consec_frames: u32,

    /// Landmark indices of the left eye
    pub left_eye: EyeIndices,

    /// Landmark indices of the right eye
    pub right_eye: EyeIndices,

    /// Face-mesh model path; no path means the model is not available
    pub model_path: Option<String>,

    /// Faces scored below this by the landmark model are discarded
    pub min_face_confidence: f32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            consec_frames: 45,
            left_eye: LEFT_EYE,
            right_eye: RIGHT_EYE,
            model_path: None,
            min_face_confidence: 0.5,
        }
    }
}

impl DmsConfig {
    /// Create strict config (alerts sooner)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.27,
            consec_frames: 30,
            ..Default::default()
        }
    }

    /// Create lenient config (fewer false positives)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.21,
            consec_frames: 75,
            ..Default::default()
        }
    }

    /// Reject values the tracker cannot work with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(DmsError::Config(format!(
                "ear_threshold must be a positive number, got {}",
                self.ear_threshold
            )));
        }
        if self.consec_frames == 0 {
            return Err(DmsError::Config("consec_frames must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_face_confidence) {
            return Err(DmsError::Config(format!(
                "min_face_confidence must be within [0, 1], got {}",
                self.min_face_confidence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DmsConfig::default();
        assert_eq!(config.ear_threshold, 0.25);
        assert_eq!(config.consec_frames, 45);
        assert_eq!(config.left_eye, LEFT_EYE);
        assert!(config.model_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(DmsConfig::strict().validate().is_ok());
        assert!(DmsConfig::lenient().validate().is_ok());
        assert!(DmsConfig::strict().consec_frames < DmsConfig::lenient().consec_frames);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_threshold = DmsConfig { ear_threshold: f32::NAN, ..Default::default() };
        assert!(matches!(bad_threshold.validate(), Err(DmsError::Config(_))));

        let zero_window = DmsConfig { consec_frames: 0, ..Default::default() };
        assert!(matches!(zero_window.validate(), Err(DmsError::Config(_))));

        let bad_confidence = DmsConfig { min_face_confidence: 1.5, ..Default::default() };
        assert!(bad_confidence.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: DmsConfig = serde_json::from_str(r#"{"consec_frames": 10}"#).unwrap();
        assert_eq!(config.consec_frames, 10);
        assert_eq!(config.ear_threshold, 0.25);
        assert_eq!(config.right_eye, RIGHT_EYE);
    }
}
