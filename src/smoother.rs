//! Per-session temporal smoothing of the nine tracked metric channels.

use crate::{
    filters::{AsymmetricEmaFilter, ScalarFilter},
    metrics::{FaceMetrics, TorsoMetrics},
};
use serde::{Deserialize, Serialize};

/// Initial value and rates for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSmoothing {
    /// Starting value before any observation
    pub initial: f64,
    /// Rate applied when the target is above the current value
    pub alpha_rise: f64,
    /// Rate applied when the target is at or below the current value
    pub alpha_fall: f64,
}

impl ChannelSmoothing {
    const fn new(initial: f64, alpha_rise: f64, alpha_fall: f64) -> Self {
        Self {
            initial,
            alpha_rise,
            alpha_fall,
        }
    }

    fn build(&self) -> AsymmetricEmaFilter {
        AsymmetricEmaFilter::new(self.initial, self.alpha_rise, self.alpha_fall)
    }
}

/// Smoothing configuration for every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub yaw: ChannelSmoothing,
    pub pitch: ChannelSmoothing,
    pub eye_x: ChannelSmoothing,
    pub eye_y: ChannelSmoothing,
    pub torso_scale: ChannelSmoothing,
    pub torso_center_x: ChannelSmoothing,
    pub torso_center_y: ChannelSmoothing,
    pub face_scale: ChannelSmoothing,
    pub eye_openness: ChannelSmoothing,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            yaw: ChannelSmoothing::new(0.0, 0.30, 0.13),
            pitch: ChannelSmoothing::new(0.0, 0.28, 0.13),
            eye_x: ChannelSmoothing::new(0.0, 0.28, 0.14),
            eye_y: ChannelSmoothing::new(0.0, 0.28, 0.14),
            torso_scale: ChannelSmoothing::new(0.18, 0.26, 0.16),
            torso_center_x: ChannelSmoothing::new(0.5, 0.20, 0.15),
            torso_center_y: ChannelSmoothing::new(0.6, 0.20, 0.15),
            face_scale: ChannelSmoothing::new(0.24, 0.24, 0.14),
            eye_openness: ChannelSmoothing::new(0.03, 0.24, 0.18),
        }
    }
}

impl SmoothingConfig {
    /// All channels as `(name, settings)` pairs
    #[must_use]
    pub fn channels(&self) -> [(&'static str, &ChannelSmoothing); 9] {
        [
            ("yaw", &self.yaw),
            ("pitch", &self.pitch),
            ("eye_x", &self.eye_x),
            ("eye_y", &self.eye_y),
            ("torso_scale", &self.torso_scale),
            ("torso_center_x", &self.torso_center_x),
            ("torso_center_y", &self.torso_center_y),
            ("face_scale", &self.face_scale),
            ("eye_openness", &self.eye_openness),
        ]
    }
}

/// Smoothed values of every channel after a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedMetrics {
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

impl SmoothedMetrics {
    /// Face metrics carrying the smoothed face channels
    #[must_use]
    pub const fn face(&self) -> FaceMetrics {
        FaceMetrics {
            yaw: self.yaw,
            pitch: self.pitch,
            eye_x: self.eye_x,
            eye_y: self.eye_y,
            eye_openness: self.eye_openness,
            face_scale: self.face_scale,
        }
    }

    /// Torso metrics carrying the smoothed torso channels and a raw visibility
    #[must_use]
    pub const fn torso(&self, visibility_score: f64) -> TorsoMetrics {
        TorsoMetrics {
            torso_scale: self.torso_scale,
            visibility_score,
            center_x: self.torso_center_x,
            center_y: self.torso_center_y,
        }
    }
}

/// Nine independent asymmetric EMA channels
#[derive(Debug, Clone)]
pub struct MetricSmoother {
    yaw: AsymmetricEmaFilter,
    pitch: AsymmetricEmaFilter,
    eye_x: AsymmetricEmaFilter,
    eye_y: AsymmetricEmaFilter,
    torso_scale: AsymmetricEmaFilter,
    torso_center_x: AsymmetricEmaFilter,
    torso_center_y: AsymmetricEmaFilter,
    face_scale: AsymmetricEmaFilter,
    eye_openness: AsymmetricEmaFilter,
}

impl Default for MetricSmoother {
    fn default() -> Self {
        Self::new(&SmoothingConfig::default())
    }
}

impl MetricSmoother {
    /// Create a smoother from per-channel settings
    #[must_use]
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            yaw: config.yaw.build(),
            pitch: config.pitch.build(),
            eye_x: config.eye_x.build(),
            eye_y: config.eye_y.build(),
            torso_scale: config.torso_scale.build(),
            torso_center_x: config.torso_center_x.build(),
            torso_center_y: config.torso_center_y.build(),
            face_scale: config.face_scale.build(),
            eye_openness: config.eye_openness.build(),
        }
    }

    /// Advance every channel by one frame
    ///
    /// Channels whose raw metric set is absent hold their previous value.
    pub fn step(&mut self, face: Option<&FaceMetrics>, torso: Option<&TorsoMetrics>) -> SmoothedMetrics {
        SmoothedMetrics {
            yaw: self.yaw.apply_or_hold(face.map(|f| f.yaw)),
            pitch: self.pitch.apply_or_hold(face.map(|f| f.pitch)),
            eye_x: self.eye_x.apply_or_hold(face.map(|f| f.eye_x)),
            eye_y: self.eye_y.apply_or_hold(face.map(|f| f.eye_y)),
            torso_scale: self.torso_scale.apply_or_hold(torso.map(|t| t.torso_scale)),
            torso_center_x: self.torso_center_x.apply_or_hold(torso.map(|t| t.center_x)),
            torso_center_y: self.torso_center_y.apply_or_hold(torso.map(|t| t.center_y)),
            face_scale: self.face_scale.apply_or_hold(face.map(|f| f.face_scale)),
            eye_openness: self.eye_openness.apply_or_hold(face.map(|f| f.eye_openness)),
        }
    }

    /// Current smoothed values without advancing
    #[must_use]
    pub fn current(&self) -> SmoothedMetrics {
        SmoothedMetrics {
            yaw: self.yaw.value(),
            pitch: self.pitch.value(),
            eye_x: self.eye_x.value(),
            eye_y: self.eye_y.value(),
            torso_scale: self.torso_scale.value(),
            torso_center_x: self.torso_center_x.value(),
            torso_center_y: self.torso_center_y.value(),
            face_scale: self.face_scale.value(),
            eye_openness: self.eye_openness.value(),
        }
    }

    /// Return every channel to its initial value
    pub fn reset(&mut self) {
        for filter in [
            &mut self.yaw,
            &mut self.pitch,
            &mut self.eye_x,
            &mut self.eye_y,
            &mut self.torso_scale,
            &mut self.torso_center_x,
            &mut self.torso_center_y,
            &mut self.face_scale,
            &mut self.eye_openness,
        ] {
            filter.reset();
        }
    }
}
