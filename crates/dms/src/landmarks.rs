//! Facial landmark types

use serde::{Deserialize, Serialize};

/// Number of landmarks describing one eye
pub const EYE_POINTS: usize = 6;

/// Landmark count of a face-mesh face with iris refinement
pub const FACE_MESH_POINTS: usize = 478;

/// A single landmark, normalized (0..1) or in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Planar Euclidean distance
    pub fn distance(&self, other: &Point2D) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Six face-mesh indices selecting one eye.
///
/// Order matters: positions 0 and 3 are the horizontal corners, 1/5 and
/// 2/4 the two vertical pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EyeIndices(pub [usize; EYE_POINTS]);

/// Driver's left eye in face-mesh numbering
pub const LEFT_EYE: EyeIndices = EyeIndices([362, 385, 387, 263, 373, 380]);

/// Driver's right eye in face-mesh numbering
pub const RIGHT_EYE: EyeIndices = EyeIndices([33, 160, 158, 133, 153, 144]);

/// All landmarks of one detected face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub points: Vec<Point2D>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pick the six points of one eye; `None` if the model output is too
    /// short for any of the indices.
    pub fn eye(&self, indices: &EyeIndices) -> Option<[Point2D; EYE_POINTS]> {
        let mut eye = [Point2D::default(); EYE_POINTS];
        for (slot, &idx) in eye.iter_mut().zip(indices.0.iter()) {
            *slot = *self.points.get(idx)?;
        }
        Some(eye)
    }

    /// Build a face whose eyes have exactly the given aspect ratios.
    ///
    /// Each eye is one unit wide with both vertical pairs `ear` apart, laid
    /// out at the standard face-mesh indices. Used by demos and tests in
    /// place of a real model.
    pub fn synthetic(left_ear: f32, right_ear: f32) -> Self {
        let mut points = vec![Point2D::default(); FACE_MESH_POINTS];
        for (indices, ear, origin_x) in [(&LEFT_EYE, left_ear, 0.6), (&RIGHT_EYE, right_ear, 0.2)] {
            let half = ear / 2.0;
            let eye = [
                Point2D::new(origin_x, 0.4),
                Point2D::new(origin_x + 0.33, 0.4 - half),
                Point2D::new(origin_x + 0.66, 0.4 - half),
                Point2D::new(origin_x + 1.0, 0.4),
                Point2D::new(origin_x + 0.66, 0.4 + half),
                Point2D::new(origin_x + 0.33, 0.4 + half),
            ];
            for (&idx, point) in indices.0.iter().zip(eye) {
                points[idx] = point;
            }
        }
        Self { points }
    }
}
