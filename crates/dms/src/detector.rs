//! Landmark models
//!
//! The face/landmark model is an external collaborator: given one frame it
//! returns zero or more faces of landmarks. Only the first face is used
//! downstream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camera_capture::VideoFrame;
use tracing::warn;

use crate::landmarks::FaceLandmarks;
use crate::{DmsConfig, DmsError};

/// A face-landmark model
pub trait LandmarkSource: Send + Sync {
    /// Human-readable model name for logs and health reports
    fn name(&self) -> &str;

    /// Landmarks of every face found in the frame, best face first
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError>;
}

/// Returns the same faces for every frame
#[derive(Debug, Clone, Default)]
pub struct StaticLandmarks {
    faces: Vec<FaceLandmarks>,
}

impl StaticLandmarks {
    pub fn new(faces: Vec<FaceLandmarks>) -> Self {
        Self { faces }
    }

    /// A model that never finds anybody
    pub fn empty() -> Self {
        Self::default()
    }

    /// A model that always sees one face with both eyes at `ear`
    pub fn with_ear(ear: f32) -> Self {
        Self::new(vec![FaceLandmarks::synthetic(ear, ear)])
    }
}

impl LandmarkSource for StaticLandmarks {
    fn name(&self) -> &str {
        "static"
    }

    fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
        Ok(self.faces.clone())
    }
}

/// Plays back a queue of per-frame outcomes, then reports no face
#[derive(Debug, Default)]
pub struct ScriptedLandmarks {
    script: Mutex<VecDeque<ScriptedOutcome>>,
}

type ScriptedOutcome = Result<Vec<FaceLandmarks>, String>;

impl ScriptedLandmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// One frame per EAR value; `None` is a frame without a face
    pub fn from_ears(ears: &[Option<f32>]) -> Self {
        let script = Self::new();
        for ear in ears {
            match ear {
                Some(ear) => script.push_faces(vec![FaceLandmarks::synthetic(*ear, *ear)]),
                None => script.push_faces(Vec::new()),
            }
        }
        script
    }

    pub fn push_faces(&self, faces: Vec<FaceLandmarks>) {
        self.queue().push_back(Ok(faces));
    }

    /// Queue a model failure
    pub fn push_failure(&self, message: impl Into<String>) {
        self.queue().push_back(Err(message.into()));
    }

    /// Outcomes not yet consumed
    pub fn remaining(&self) -> usize {
        self.queue().len()
    }

    // The queue holds plain data, so a panic elsewhere cannot leave it torn.
    fn queue(&self) -> MutexGuard<'_, VecDeque<ScriptedOutcome>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LandmarkSource for ScriptedLandmarks {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&self, _frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
        let next = self.queue().pop_front();

        match next {
            Some(Ok(faces)) => Ok(faces),
            Some(Err(message)) => Err(DmsError::Inference(message)),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::FaceMeshOnnx;

#[cfg(feature = "onnx")]
mod onnx {
    use camera_capture::VideoFrame;
    use image::imageops::FilterType;
    use ndarray::Array4;
    use ort::{GraphOptimizationLevel, Session};
    use tracing::{debug, error, info};

    use super::LandmarkSource;
    use crate::landmarks::{FaceLandmarks, Point2D};
    use crate::DmsError;

    /// Model input edge length (pixels)
    const INPUT_SIZE: u32 = 192;

    /// Face-mesh landmark model (ONNX export of the 468/478-point mesh).
    ///
    /// Expects cabin-camera frames roughly framed on the driver: the whole
    /// frame is fed to the mesh without a separate face-detection stage.
    /// Output 0 holds `x, y, z` triples in input-pixel space, output 1 the
    /// face-presence logit.
    pub struct FaceMeshOnnx {
        session: Session,
        min_face_confidence: f32,
    }

    impl FaceMeshOnnx {
        pub fn load(path: &str, min_face_confidence: f32) -> Result<Self, DmsError> {
            info!("Loading face mesh model from {}", path);
            let session = Session::builder()
                .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|builder| builder.commit_from_file(path))
                .map_err(|e| {
                    error!("Failed to load face mesh model: {}", e);
                    DmsError::ModelLoad(e.to_string())
                })?;

            Ok(Self {
                session,
                min_face_confidence,
            })
        }
    }

    impl LandmarkSource for FaceMeshOnnx {
        fn name(&self) -> &str {
            "face-mesh-onnx"
        }

        fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
            let img = frame.to_rgb_image().ok_or_else(|| {
                DmsError::ImageProcessing("frame buffer does not match its dimensions".into())
            })?;

            // 1. Preprocess: resize to 192x192, NHWC, 0..1
            let resized = image::imageops::resize(&img, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
            let size = INPUT_SIZE as usize;
            let mut input = Array4::<f32>::zeros((1, size, size, 3));
            for (x, y, pixel) in resized.enumerate_pixels() {
                for c in 0..3 {
                    input[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
                }
            }

            // 2. Inference
            let outputs = self
                .session
                .run(ort::inputs![input].map_err(|e| DmsError::Inference(e.to_string()))?)
                .map_err(|e| DmsError::Inference(e.to_string()))?;

            // 3. Face presence
            let logit = outputs[1]
                .try_extract_tensor::<f32>()
                .map_err(|e| DmsError::Inference(e.to_string()))?
                .iter()
                .next()
                .copied()
                .unwrap_or(f32::NEG_INFINITY);
            let score = 1.0 / (1.0 + (-logit).exp());
            if score < self.min_face_confidence {
                debug!("Face presence {:.2} below {:.2}", score, self.min_face_confidence);
                return Ok(Vec::new());
            }

            // 4. Landmarks back to frame pixel space (keeps the EAR isotropic)
            let coords = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| DmsError::Inference(e.to_string()))?;
            let values: Vec<f32> = coords.iter().copied().collect();
            let sx = frame.width as f32 / INPUT_SIZE as f32;
            let sy = frame.height as f32 / INPUT_SIZE as f32;
            let points = values
                .chunks_exact(3)
                .map(|xyz| Point2D::new(xyz[0] * sx, xyz[1] * sy))
                .collect();

            Ok(vec![FaceLandmarks::new(points)])
        }
    }
}

/// Build the configured landmark model.
///
/// `Ok(None)` means no model is available (no path configured, or built
/// without the `onnx` feature); callers report "model not initialized".
pub fn load_landmark_source(config: &DmsConfig) -> Result<Option<Arc<dyn LandmarkSource>>, DmsError> {
    let Some(path) = config.model_path.as_deref() else {
        warn!("No landmark model path configured");
        return Ok(None);
    };

    #[cfg(feature = "onnx")]
    {
        let mesh = FaceMeshOnnx::load(path, config.min_face_confidence)?;
        Ok(Some(Arc::new(mesh)))
    }

    #[cfg(not(feature = "onnx"))]
    {
        warn!("Built without the `onnx` feature; ignoring landmark model at {}", path);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LEFT_EYE, RIGHT_EYE};

    fn frame() -> VideoFrame {
        VideoFrame::new(vec![0; 12], 2, 2, 0, 0)
    }

    #[test]
    fn test_static_landmarks() {
        let source = StaticLandmarks::with_ear(0.3);
        let faces = source.detect(&frame()).unwrap();
        assert_eq!(faces.len(), 1);
        assert!(faces[0].eye(&LEFT_EYE).is_some());
        assert!(faces[0].eye(&RIGHT_EYE).is_some());

        assert!(StaticLandmarks::empty().detect(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_scripted_plays_in_order() {
        let source = ScriptedLandmarks::from_ears(&[Some(0.3), None]);
        source.push_failure("model crashed");
        assert_eq!(source.remaining(), 3);

        assert_eq!(source.detect(&frame()).unwrap().len(), 1);
        assert!(source.detect(&frame()).unwrap().is_empty());
        assert!(matches!(source.detect(&frame()), Err(DmsError::Inference(_))));
        // Exhausted: nobody there
        assert!(source.detect(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_scripted_survives_poisoned_lock() {
        let source = Arc::new(ScriptedLandmarks::new());
        let holder = Arc::clone(&source);
        let _ = std::thread::spawn(move || {
            let _guard = holder.script.lock().unwrap();
            panic!("worker died while holding the script");
        })
        .join();
        assert!(source.script.is_poisoned());

        source.push_faces(vec![FaceLandmarks::synthetic(0.3, 0.3)]);
        source.push_failure("model crashed");
        assert_eq!(source.remaining(), 2);

        assert_eq!(source.detect(&frame()).unwrap().len(), 1);
        assert!(matches!(source.detect(&frame()), Err(DmsError::Inference(_))));
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_no_model_path_means_not_ready() {
        let source = load_landmark_source(&DmsConfig::default()).unwrap();
        assert!(source.is_none());
    }
}
