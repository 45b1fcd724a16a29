//! DMS analysis results

use camera_capture::VideoFrame;
use serde::Serialize;
use tracing::debug;

use crate::detector::LandmarkSource;
use crate::ear::DetectionFrame;
use crate::tracker::{TrackerPhase, TrackerUpdate};
use crate::{DmsConfig, DmsError};

/// Outcome of one detection-session tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAnalysis {
    /// Sequence number of the analyzed frame
    pub sequence: u32,
    /// EAR readings
    pub frame: DetectionFrame,
    /// Tracker state after this frame
    pub tracker: TrackerUpdate,
    /// Tracker phase after this frame
    pub phase: TrackerPhase,
}

impl FrameAnalysis {
    /// Whether the alarm should be sounding
    pub fn has_alert(&self) -> bool {
        self.tracker.alert_active
    }
}

/// Stateless single-image verdict (server mode)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SingleFrameVerdict {
    pub left_ear: f32,
    pub right_ear: f32,
    pub ear: f32,
    pub threshold: f32,
    pub is_eyes_closed: bool,
}

impl SingleFrameVerdict {
    fn from_frame(frame: &DetectionFrame, threshold: f32) -> Self {
        Self {
            left_ear: frame.left_ear,
            right_ear: frame.right_ear,
            ear: frame.avg_ear,
            threshold,
            is_eyes_closed: frame.is_eyes_closed(threshold),
        }
    }
}

/// Compare one image against the EAR cutoff.
///
/// No tracker is involved: each call stands alone. `Ok(None)` means the
/// model found no face; model failures are returned as errors.
pub fn evaluate_single(
    source: &dyn LandmarkSource,
    frame: &VideoFrame,
    config: &DmsConfig,
) -> Result<Option<SingleFrameVerdict>, DmsError> {
    let faces = source.detect(frame)?;
    if faces.len() > 1 {
        debug!("{} faces detected, using the first", faces.len());
    }

    let Some(face) = faces.first() else {
        return Ok(None);
    };

    let reading = DetectionFrame::from_face(Some(face), &config.left_eye, &config.right_eye);
    Ok(Some(SingleFrameVerdict::from_frame(&reading, config.ear_threshold)))
}
