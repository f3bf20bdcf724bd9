//! Signal sensitivity parameters and their personalized derivation.
//!
//! [`SignalThresholds::default`] is the static profile used by the live
//! classifier. [`build_adaptive_thresholds`] is an opt-in refinement that
//! widens the delta thresholds for users whose calibration showed more
//! natural movement.

use crate::{
    baseline::Baseline,
    calibration::CalibrationSamples,
    utils::{clamp, finite_or, median_absolute_deviation},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Named sensitivity parameters for the signal classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Minimum torso visibility to trust the pose
    pub min_pose_visibility: f64,
    /// Yaw delta that counts as one unit of look-away
    pub yaw_away_delta: f64,
    /// Horizontal gaze delta that counts as one unit of look-away
    pub eye_x_away_delta: f64,
    /// Weighted yaw+gaze score that triggers look-away
    pub look_score_threshold: f64,
    /// Normalized yaw that alone triggers look-away
    pub look_extreme_yaw: f64,
    /// Normalized gaze that alone triggers look-away
    pub look_extreme_eye: f64,
    /// Pitch delta that counts as one unit of head-down
    pub pitch_down_delta: f64,
    /// Vertical gaze delta that counts as one unit of eyes-down
    pub eye_y_down_delta: f64,
    /// Torso center drop that counts as one unit of slouch
    pub torso_down_delta: f64,
    /// Fraction of baseline torso scale required for presence
    pub torso_present_ratio: f64,
    /// Fraction of baseline torso scale below which the user is leaving
    pub torso_leave_ratio: f64,
    /// Absolute floor on the torso scale for presence
    pub min_torso_scale: f64,
    /// Horizontal torso shift that counts as moved away
    pub body_shift_x_delta: f64,
    /// Vertical torso shift that counts as moved away
    pub body_shift_y_delta: f64,
    /// Eye openness below which gaze is untrustworthy
    pub min_eye_openness: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            min_pose_visibility: 0.35,
            yaw_away_delta: 0.16,
            eye_x_away_delta: 0.14,
            look_score_threshold: 1.42,
            look_extreme_yaw: 1.5,
            look_extreme_eye: 1.22,
            pitch_down_delta: 0.14,
            eye_y_down_delta: 0.1,
            torso_down_delta: 0.055,
            torso_present_ratio: 0.55,
            torso_leave_ratio: 0.45,
            min_torso_scale: 0.075,
            body_shift_x_delta: 0.2,
            body_shift_y_delta: 0.16,
            min_eye_openness: 0.012,
        }
    }
}

impl SignalThresholds {
    /// Replace every non-finite field with the built-in default
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            min_pose_visibility: finite_or(self.min_pose_visibility, d.min_pose_visibility),
            yaw_away_delta: finite_or(self.yaw_away_delta, d.yaw_away_delta),
            eye_x_away_delta: finite_or(self.eye_x_away_delta, d.eye_x_away_delta),
            look_score_threshold: finite_or(self.look_score_threshold, d.look_score_threshold),
            look_extreme_yaw: finite_or(self.look_extreme_yaw, d.look_extreme_yaw),
            look_extreme_eye: finite_or(self.look_extreme_eye, d.look_extreme_eye),
            pitch_down_delta: finite_or(self.pitch_down_delta, d.pitch_down_delta),
            eye_y_down_delta: finite_or(self.eye_y_down_delta, d.eye_y_down_delta),
            torso_down_delta: finite_or(self.torso_down_delta, d.torso_down_delta),
            torso_present_ratio: finite_or(self.torso_present_ratio, d.torso_present_ratio),
            torso_leave_ratio: finite_or(self.torso_leave_ratio, d.torso_leave_ratio),
            min_torso_scale: finite_or(self.min_torso_scale, d.min_torso_scale),
            body_shift_x_delta: finite_or(self.body_shift_x_delta, d.body_shift_x_delta),
            body_shift_y_delta: finite_or(self.body_shift_y_delta, d.body_shift_y_delta),
            min_eye_openness: finite_or(self.min_eye_openness, d.min_eye_openness),
        }
    }
}

/// How one delta threshold widens with calibration dispersion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveRule {
    /// Multiplier on the channel MAD
    pub scale: f64,
    /// Constant added after scaling
    pub floor: f64,
    /// Lower clamp
    pub min: f64,
    /// Upper clamp
    pub max: f64,
}

impl AdaptiveRule {
    const fn new(scale: f64, floor: f64, min: f64, max: f64) -> Self {
        Self { scale, floor, min, max }
    }

    /// `clamp(max(default, mad * scale + floor), min, max)`
    #[must_use]
    pub fn apply(&self, default: f64, mad: f64) -> f64 {
        clamp(default.max(mad * self.scale + self.floor), self.min, self.max)
    }
}

pub const YAW_RULE: AdaptiveRule = AdaptiveRule::new(3.8, 0.035, 0.14, 0.42);
pub const EYE_X_RULE: AdaptiveRule = AdaptiveRule::new(3.9, 0.03, 0.12, 0.36);
pub const PITCH_RULE: AdaptiveRule = AdaptiveRule::new(3.5, 0.04, 0.12, 0.35);
pub const EYE_Y_RULE: AdaptiveRule = AdaptiveRule::new(3.6, 0.03, 0.08, 0.30);
pub const TORSO_DOWN_RULE: AdaptiveRule = AdaptiveRule::new(3.1, 0.024, 0.04, 0.22);
pub const BODY_SHIFT_X_RULE: AdaptiveRule = AdaptiveRule::new(4.4, 0.06, 0.12, 0.34);
pub const BODY_SHIFT_Y_RULE: AdaptiveRule = AdaptiveRule::new(4.3, 0.05, 0.10, 0.34);

/// MAD used when a channel has no samples
pub const GAZE_MAD_FALLBACK: f64 = 0.02;
pub const TORSO_SCALE_MAD_FALLBACK: f64 = 0.01;
pub const TORSO_CENTER_MAD_FALLBACK: f64 = 0.012;

/// Ratio nudges per unit of torso-scale MAD, with their clamps
const TORSO_PRESENT_NUDGE: f64 = 0.55;
const TORSO_PRESENT_RANGE: (f64, f64) = (0.5, 0.68);
const TORSO_LEAVE_NUDGE: f64 = 0.4;
const TORSO_LEAVE_RANGE: (f64, f64) = (0.35, 0.58);

/// Per-channel MAD of calibration samples around the baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationDispersion {
    pub yaw: f64,
    pub eye_x: f64,
    pub pitch: f64,
    pub eye_y: f64,
    pub torso_scale: f64,
    pub torso_center_x: f64,
    pub torso_center_y: f64,
}

impl CalibrationDispersion {
    /// Measure dispersion of `samples` around `baseline`
    #[must_use]
    pub fn measure(samples: &CalibrationSamples, baseline: &Baseline) -> Self {
        let mad = |buffer: &VecDeque<f64>, pivot: f64, fallback: f64| {
            finite_or(
                median_absolute_deviation(&CalibrationSamples::values(buffer), Some(pivot), fallback),
                fallback,
            )
        };
        Self {
            yaw: mad(&samples.yaw, baseline.yaw, GAZE_MAD_FALLBACK),
            eye_x: mad(&samples.eye_x, baseline.eye_x, GAZE_MAD_FALLBACK),
            pitch: mad(&samples.pitch, baseline.pitch, GAZE_MAD_FALLBACK),
            eye_y: mad(&samples.eye_y, baseline.eye_y, GAZE_MAD_FALLBACK),
            torso_scale: mad(&samples.torso_scale, baseline.torso_scale, TORSO_SCALE_MAD_FALLBACK),
            torso_center_x: mad(&samples.torso_center_x, baseline.torso_center_x, TORSO_CENTER_MAD_FALLBACK),
            torso_center_y: mad(&samples.torso_center_y, baseline.torso_center_y, TORSO_CENTER_MAD_FALLBACK),
        }
    }
}

/// Derive a personalized threshold profile from calibration dispersion
///
/// Pure transform of `(samples, baseline, defaults)`. Delta thresholds never
/// drop below their default; fields without an adaptive rule are copied from
/// `defaults` unchanged.
#[must_use]
pub fn build_adaptive_thresholds(
    samples: &CalibrationSamples,
    baseline: &Baseline,
    defaults: &SignalThresholds,
) -> SignalThresholds {
    let defaults = defaults.sanitized();
    let mad = CalibrationDispersion::measure(samples, &baseline.sanitized());

    SignalThresholds {
        yaw_away_delta: YAW_RULE.apply(defaults.yaw_away_delta, mad.yaw),
        eye_x_away_delta: EYE_X_RULE.apply(defaults.eye_x_away_delta, mad.eye_x),
        pitch_down_delta: PITCH_RULE.apply(defaults.pitch_down_delta, mad.pitch),
        eye_y_down_delta: EYE_Y_RULE.apply(defaults.eye_y_down_delta, mad.eye_y),
        torso_down_delta: TORSO_DOWN_RULE.apply(defaults.torso_down_delta, mad.torso_center_y),
        body_shift_x_delta: BODY_SHIFT_X_RULE.apply(defaults.body_shift_x_delta, mad.torso_center_x),
        body_shift_y_delta: BODY_SHIFT_Y_RULE.apply(defaults.body_shift_y_delta, mad.torso_center_y),
        torso_present_ratio: clamp(
            defaults.torso_present_ratio + mad.torso_scale * TORSO_PRESENT_NUDGE,
            TORSO_PRESENT_RANGE.0,
            TORSO_PRESENT_RANGE.1,
        ),
        torso_leave_ratio: clamp(
            defaults.torso_leave_ratio + mad.torso_scale * TORSO_LEAVE_NUDGE,
            TORSO_LEAVE_RANGE.0,
            TORSO_LEAVE_RANGE.1,
        ),
        ..defaults
    }
}
