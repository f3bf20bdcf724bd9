//! Personalized reference values for every tracked metric.

use crate::utils::finite_or;
use serde::{Deserialize, Serialize};

/// Reference value per metric, fixed once calibration completes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baseline {
    pub yaw: f64,
    pub pitch: f64,
    pub eye_x: f64,
    pub eye_y: f64,
    pub torso_scale: f64,
    pub torso_center_x: f64,
    pub torso_center_y: f64,
    pub face_scale: f64,
    pub eye_openness: f64,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            eye_x: 0.0,
            eye_y: 0.0,
            torso_scale: 0.18,
            torso_center_x: 0.5,
            torso_center_y: 0.6,
            face_scale: 0.24,
            eye_openness: 0.03,
        }
    }
}

impl Baseline {
    /// Replace every non-finite field with the built-in default
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            yaw: finite_or(self.yaw, d.yaw),
            pitch: finite_or(self.pitch, d.pitch),
            eye_x: finite_or(self.eye_x, d.eye_x),
            eye_y: finite_or(self.eye_y, d.eye_y),
            torso_scale: finite_or(self.torso_scale, d.torso_scale),
            torso_center_x: finite_or(self.torso_center_x, d.torso_center_x),
            torso_center_y: finite_or(self.torso_center_y, d.torso_center_y),
            face_scale: finite_or(self.face_scale, d.face_scale),
            eye_openness: finite_or(self.eye_openness, d.eye_openness),
        }
    }
}
