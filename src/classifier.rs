//! Signal classification: smoothed metrics against the baseline.
//!
//! [`classify_focus_signals`] is stateless and total. Absent metrics are a
//! first-class input, not an error, and every intermediate quantity is
//! reported back for observability.

use crate::{
    baseline::Baseline,
    constants::GEOMETRY_EPSILON,
    metrics::{FaceMetrics, TorsoMetrics},
    thresholds::SignalThresholds,
    utils::{clamp, finite_or, safe_ratio},
};

/// Normalized yaw and gaze that together indicate look-away
const LOOK_PAIR_STRONG: f64 = 1.08;
const LOOK_PAIR_YAW_SUPPORT: f64 = 0.52;
const LOOK_PAIR_EYE_SUPPORT: f64 = 0.4;

/// Weights of the combined look score
const LOOK_YAW_WEIGHT: f64 = 0.72;
const LOOK_EYE_WEIGHT: f64 = 0.64;

/// Head-down posture gates
const PHONE_TORSO_SUPPORT: f64 = 0.7;
const PHONE_COMBINED_DOWN: f64 = 2.45;

/// Face shrink (fraction of baseline) read as leaning out of frame
const LEAN_BACK_SHRINK: f64 = 0.35;

/// Confidence contributions
const CONFIDENCE_BASE: f64 = 0.08;
const CONFIDENCE_FACE: f64 = 0.42;
const CONFIDENCE_TORSO_VISIBLE: f64 = 0.24;
const CONFIDENCE_TORSO_PRESENT: f64 = 0.18;
const CONFIDENCE_EYES_RELIABLE: f64 = 0.10;
const CONFIDENCE_EYES_UNRELIABLE: f64 = -0.08;

/// Caller-supplied presence decisions that replace the raw ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceOverride {
    pub face_present: Option<bool>,
    pub torso_present: Option<bool>,
}

/// Deltas against the baseline
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalDeltas {
    pub yaw_delta: f64,
    pub pitch_delta: f64,
    pub eye_x_delta: f64,
    pub eye_y_delta: f64,
    pub torso_scale: f64,
    pub torso_center_x_delta: f64,
    pub torso_center_y_delta: f64,
    pub face_scale_delta: f64,
    pub eye_openness: f64,
    pub look_score: f64,
}

/// Raw presence and normalized intermediates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalQuality {
    pub raw_face_present: bool,
    pub raw_torso_visible_enough: bool,
    pub raw_torso_present: bool,
    pub eye_tracking_reliable: bool,
    pub yaw_norm: f64,
    pub eye_norm: f64,
    pub pitch_norm: f64,
    pub eye_down_norm: f64,
    pub torso_down_norm: f64,
}

/// Attention signals for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FocusSignals {
    pub face_present: bool,
    pub torso_present: bool,
    pub look_away: bool,
    pub phone_like_down: bool,
    pub left_seat_like: bool,
    /// Detection confidence, 0..1
    pub confidence: f64,
    pub deltas: SignalDeltas,
    pub quality: SignalQuality,
}

impl FocusSignals {
    /// Signals carrying only the boolean flags
    ///
    /// Intermediates stay zeroed; confidence is 1. Useful for driving the
    /// state machine from an external classifier.
    #[must_use]
    pub fn from_flags(
        face_present: bool,
        torso_present: bool,
        look_away: bool,
        phone_like_down: bool,
        left_seat_like: bool,
    ) -> Self {
        Self {
            face_present,
            torso_present,
            look_away,
            phone_like_down,
            left_seat_like,
            confidence: 1.0,
            ..Self::default()
        }
    }

    /// Face and torso present, no off-focus flag
    #[must_use]
    pub fn focused() -> Self {
        Self::from_flags(true, true, false, false, false)
    }

    /// Face and torso present with no off-focus flag raised
    #[must_use]
    pub const fn is_strong_focus(&self) -> bool {
        self.face_present && self.torso_present && !self.look_away && !self.phone_like_down && !self.left_seat_like
    }
}

/// Classify one frame of smoothed metrics
///
/// `face`/`torso` are `None` when the detector saw nothing on this frame.
/// Non-finite baseline or threshold fields fall back to their defaults.
#[must_use]
pub fn classify_focus_signals(
    face: Option<&FaceMetrics>,
    torso: Option<&TorsoMetrics>,
    baseline: &Baseline,
    thresholds: &SignalThresholds,
    presence: PresenceOverride,
) -> FocusSignals {
    let baseline = baseline.sanitized();
    let t = thresholds.sanitized();

    // Presence
    let raw_face_present = face.is_some();
    let raw_torso_visible_enough =
        torso.is_some_and(|m| finite_or(m.visibility_score, 0.0) >= t.min_pose_visibility);

    let torso_scale = torso.map_or(0.0, |m| finite_or(m.torso_scale, 0.0));
    let torso_present_min = t.min_torso_scale.max(baseline.torso_scale * t.torso_present_ratio);
    let torso_leave_min = t.min_torso_scale.max(baseline.torso_scale * t.torso_leave_ratio);
    let raw_torso_present = raw_torso_visible_enough && torso_scale >= torso_present_min;

    let face_present = presence.face_present.unwrap_or(raw_face_present);
    let torso_present = presence.torso_present.unwrap_or(raw_torso_present);

    // Deltas
    let face_delta = |value: Option<f64>, reference: f64| {
        if face_present {
            finite_or(value.unwrap_or(0.0), 0.0) - reference
        } else {
            0.0
        }
    };
    let yaw_delta = face_delta(face.map(|m| m.yaw), baseline.yaw);
    let pitch_delta = face_delta(face.map(|m| m.pitch), baseline.pitch);
    let eye_x_delta = face_delta(face.map(|m| m.eye_x), baseline.eye_x);
    let eye_y_delta = face_delta(face.map(|m| m.eye_y), baseline.eye_y);
    let face_scale_delta = face_delta(face.map(|m| m.face_scale), baseline.face_scale);

    let torso_center_x_delta =
        torso.map_or(baseline.torso_center_x, |m| finite_or(m.center_x, baseline.torso_center_x))
            - baseline.torso_center_x;
    let torso_center_y_delta =
        torso.map_or(baseline.torso_center_y, |m| finite_or(m.center_y, baseline.torso_center_y))
            - baseline.torso_center_y;

    // Closed or occluded eyes make iris offsets meaningless
    let eye_openness = if face_present {
        face.map_or(baseline.eye_openness, |m| finite_or(m.eye_openness, baseline.eye_openness))
    } else {
        0.0
    };
    let eye_tracking_reliable = eye_openness >= t.min_eye_openness;

    // Look away
    let yaw_norm = safe_ratio(yaw_delta.abs(), t.yaw_away_delta, GEOMETRY_EPSILON);
    let eye_norm = safe_ratio(eye_x_delta.abs(), t.eye_x_away_delta, GEOMETRY_EPSILON);
    let look_score = yaw_norm * LOOK_YAW_WEIGHT + eye_norm * LOOK_EYE_WEIGHT;

    let look_away = face_present
        && eye_tracking_reliable
        && ((yaw_norm >= LOOK_PAIR_STRONG && eye_norm >= LOOK_PAIR_YAW_SUPPORT)
            || (eye_norm >= LOOK_PAIR_STRONG && yaw_norm >= LOOK_PAIR_EYE_SUPPORT)
            || look_score >= t.look_score_threshold
            || yaw_norm >= t.look_extreme_yaw
            || eye_norm >= t.look_extreme_eye);

    // Head dropped toward the lap
    let pitch_norm = safe_ratio(pitch_delta, t.pitch_down_delta, GEOMETRY_EPSILON);
    let eye_down_norm = safe_ratio(eye_y_delta, t.eye_y_down_delta, GEOMETRY_EPSILON);
    let torso_down_norm = safe_ratio(torso_center_y_delta, t.torso_down_delta, GEOMETRY_EPSILON);

    let phone_like_down = face_present
        && eye_tracking_reliable
        && pitch_norm >= 1.0
        && eye_down_norm >= 1.0
        && (torso_down_norm >= PHONE_TORSO_SUPPORT || pitch_norm + eye_down_norm >= PHONE_COMBINED_DOWN);

    // Leaving the seat
    let body_shifted =
        torso_center_x_delta.abs() >= t.body_shift_x_delta || torso_center_y_delta.abs() >= t.body_shift_y_delta;

    let left_seat_like = (!face_present && !torso_present)
        || (!face_present && torso_scale > 0.0 && torso_scale < torso_leave_min)
        || (!face_present && body_shifted)
        || (face_present && !torso_present && face_scale_delta < -baseline.face_scale.abs() * LEAN_BACK_SHRINK);

    // Confidence
    let mut confidence = CONFIDENCE_BASE;
    if raw_face_present {
        confidence += CONFIDENCE_FACE;
    }
    if raw_torso_visible_enough {
        confidence += CONFIDENCE_TORSO_VISIBLE;
    }
    if raw_torso_present {
        confidence += CONFIDENCE_TORSO_PRESENT;
    }
    if eye_tracking_reliable {
        confidence += CONFIDENCE_EYES_RELIABLE;
    } else if raw_face_present {
        confidence += CONFIDENCE_EYES_UNRELIABLE;
    }

    FocusSignals {
        face_present,
        torso_present,
        look_away,
        phone_like_down,
        left_seat_like,
        confidence: clamp(confidence, 0.0, 1.0),
        deltas: SignalDeltas {
            yaw_delta,
            pitch_delta,
            eye_x_delta,
            eye_y_delta,
            torso_scale,
            torso_center_x_delta,
            torso_center_y_delta,
            face_scale_delta,
            eye_openness,
            look_score,
        },
        quality: SignalQuality {
            raw_face_present,
            raw_torso_visible_enough,
            raw_torso_present,
            eye_tracking_reliable,
            yaw_norm,
            eye_norm,
            pitch_norm,
            eye_down_norm,
            torso_down_norm,
        },
    }
}
