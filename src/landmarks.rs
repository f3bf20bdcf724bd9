//! Landmark points and per-frame landmark sets.
//!
//! A landmark provider supplies at most one face mesh and one body pose per
//! frame, each as an ordered list of normalized points. Indices follow the
//! canonical topologies listed in [`crate::constants`].

use crate::Result;
use serde::{Deserialize, Serialize};

/// A normalized 2-D keypoint with optional detector visibility
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, 0..1 across the frame
    pub x: f64,
    /// Vertical position, 0..1 down the frame
    pub y: f64,
    /// Detector visibility/confidence, when the model reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    /// Create a landmark without visibility
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, visibility: None }
    }

    /// Create a landmark with a visibility score
    #[must_use]
    pub const fn with_visibility(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    /// Both coordinates are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another landmark
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Visibility, with missing or non-finite values read as 0
    #[must_use]
    pub fn visibility_or_zero(&self) -> f64 {
        match self.visibility {
            Some(v) if v.is_finite() => v,
            _ => 0.0,
        }
    }
}

/// Look up a landmark, treating out-of-range or non-finite points as missing
#[must_use]
pub fn landmark_at(landmarks: &[Landmark], index: usize) -> Option<&Landmark> {
    landmarks.get(index).filter(|p| p.is_finite())
}

/// Landmarks observed on a single frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Frame timestamp in milliseconds on the session clock
    pub t_ms: f64,
    /// Face mesh points, absent when no face was detected
    #[serde(default)]
    pub face: Option<Vec<Landmark>>,
    /// Body pose points, absent when no body was detected
    #[serde(default)]
    pub pose: Option<Vec<Landmark>>,
}

impl LandmarkFrame {
    /// Decode one JSON-encoded frame
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a valid frame object.
    pub fn from_json(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Face points as a slice, if any
    #[must_use]
    pub fn face_points(&self) -> Option<&[Landmark]> {
        self.face.as_deref()
    }

    /// Pose points as a slice, if any
    #[must_use]
    pub fn pose_points(&self) -> Option<&[Landmark]> {
        self.pose.as_deref()
    }
}
