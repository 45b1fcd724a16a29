//! Eye Aspect Ratio (EAR)
//!
//! EAR = (|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)
//!
//! Roughly 0.1 for a closed eye and 0.3-0.4 for an open one. The ratio is
//! invariant to translation and uniform scaling, so normalized and
//! pixel-space landmarks give the same value.

use serde::{Deserialize, Serialize};

use crate::landmarks::{EyeIndices, FaceLandmarks, Point2D, EYE_POINTS};

/// Horizontal spans at or below this are treated as an unresolved eye
const MIN_EYE_WIDTH: f32 = 1e-6;

/// EAR of one eye.
///
/// Returns `0.0` when the input does not hold exactly six points or the eye
/// is degenerate (zero horizontal span, non-finite result).
pub fn eye_aspect_ratio(eye: &[Point2D]) -> f32 {
    if eye.len() != EYE_POINTS {
        return 0.0;
    }

    let a = eye[1].distance(&eye[5]);
    let b = eye[2].distance(&eye[4]);
    let c = eye[0].distance(&eye[3]);
    if c <= MIN_EYE_WIDTH {
        return 0.0;
    }

    let ear = (a + b) / (2.0 * c);
    if ear.is_finite() {
        ear
    } else {
        0.0
    }
}

/// Unweighted mean of both eyes. An unusable eye still counts as a `0.0` leg.
pub fn average_ear(left: f32, right: f32) -> f32 {
    (left + right) / 2.0
}

/// EAR readings for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    #[serde(rename = "leftEAR")]
    pub left_ear: f32,
    #[serde(rename = "rightEAR")]
    pub right_ear: f32,
    #[serde(rename = "avgEAR")]
    pub avg_ear: f32,
    pub face_found: bool,
}

impl DetectionFrame {
    /// Reading for a frame where the model found nobody
    pub fn no_face() -> Self {
        Self::default()
    }

    /// Evaluate the first detected face, if any
    pub fn from_face(face: Option<&FaceLandmarks>, left: &EyeIndices, right: &EyeIndices) -> Self {
        let Some(face) = face else {
            return Self::no_face();
        };

        let left_ear = face.eye(left).map_or(0.0, |eye| eye_aspect_ratio(&eye));
        let right_ear = face.eye(right).map_or(0.0, |eye| eye_aspect_ratio(&eye));

        Self {
            left_ear,
            right_ear,
            avg_ear: average_ear(left_ear, right_ear),
            face_found: true,
        }
    }

    /// Eyes count as closed only when a face was seen
    pub fn is_eyes_closed(&self, threshold: f32) -> bool {
        self.face_found && self.avg_ear < threshold
    }
}
