//! Geometric metric extraction from landmark sets.
//!
//! Both extractors are total: a missing or non-finite required point makes
//! the whole metric set absent rather than producing an error.

use crate::{
    constants::{
        FACE_CHIN, FACE_FOREHEAD, FACE_LEFT_EYELID_LOWER, FACE_LEFT_EYELID_UPPER, FACE_LEFT_EYE_INNER,
        FACE_LEFT_EYE_OUTER, FACE_LEFT_IRIS, FACE_NOSE_TIP, FACE_RIGHT_EYELID_LOWER, FACE_RIGHT_EYELID_UPPER,
        FACE_RIGHT_EYE_INNER, FACE_RIGHT_EYE_OUTER, FACE_RIGHT_IRIS, FACE_SCALE_HEIGHT_WEIGHT,
        FACE_SCALE_WIDTH_WEIGHT, GEOMETRY_EPSILON, POSE_LEFT_HIP, POSE_LEFT_SHOULDER, POSE_RIGHT_HIP,
        POSE_RIGHT_SHOULDER, TORSO_HEIGHT_WEIGHT, TORSO_HIP_WEIGHT, TORSO_SHOULDER_WEIGHT,
    },
    landmarks::{landmark_at, Landmark},
    utils::clamp,
};

/// Head and gaze scalars derived from one face mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMetrics {
    /// Nose-tip offset from the inter-eye center, in eye distances
    pub yaw: f64,
    /// Nose-tip drop below the eye line, in face heights
    pub pitch: f64,
    /// Horizontal iris position within the eye, -0.5..0.5
    pub eye_x: f64,
    /// Vertical iris position within the eyelids, -0.5..0.5
    pub eye_y: f64,
    /// Eyelid gap over eye width, 0..1
    pub eye_openness: f64,
    /// Blend of face height and width
    pub face_scale: f64,
}

/// Upper-body scalars derived from one pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsoMetrics {
    /// Blend of shoulder width, torso height and hip width
    pub torso_scale: f64,
    /// Lowest visibility among shoulders and hips
    pub visibility_score: f64,
    /// Mean x of shoulders and hips
    pub center_x: f64,
    /// Mean y of shoulders and hips
    pub center_y: f64,
}

/// Position of `value` inside the `[edge_a, edge_b]` span, centered at 0
fn normalize_offset(value: f64, edge_a: f64, edge_b: f64) -> f64 {
    let min = edge_a.min(edge_b);
    let max = edge_a.max(edge_b);
    let span = (max - min).max(GEOMETRY_EPSILON);
    (clamp(value, min, max) - min) / span - 0.5
}

/// Compute face metrics from a face mesh
///
/// Returns `None` when any of the 13 required points is missing or non-finite.
#[must_use]
pub fn compute_face_metrics(landmarks: &[Landmark]) -> Option<FaceMetrics> {
    let nose_tip = landmark_at(landmarks, FACE_NOSE_TIP)?;
    let forehead = landmark_at(landmarks, FACE_FOREHEAD)?;
    let chin = landmark_at(landmarks, FACE_CHIN)?;
    let left_outer = landmark_at(landmarks, FACE_LEFT_EYE_OUTER)?;
    let left_inner = landmark_at(landmarks, FACE_LEFT_EYE_INNER)?;
    let right_inner = landmark_at(landmarks, FACE_RIGHT_EYE_INNER)?;
    let right_outer = landmark_at(landmarks, FACE_RIGHT_EYE_OUTER)?;
    let left_upper = landmark_at(landmarks, FACE_LEFT_EYELID_UPPER)?;
    let left_lower = landmark_at(landmarks, FACE_LEFT_EYELID_LOWER)?;
    let right_upper = landmark_at(landmarks, FACE_RIGHT_EYELID_UPPER)?;
    let right_lower = landmark_at(landmarks, FACE_RIGHT_EYELID_LOWER)?;
    let left_iris = landmark_at(landmarks, FACE_LEFT_IRIS)?;
    let right_iris = landmark_at(landmarks, FACE_RIGHT_IRIS)?;

    let left_eye_center_x = (left_outer.x + left_inner.x) * 0.5;
    let right_eye_center_x = (right_outer.x + right_inner.x) * 0.5;
    let eye_center_x = (left_eye_center_x + right_eye_center_x) * 0.5;
    let eye_center_y = (left_upper.y + left_lower.y + right_upper.y + right_lower.y) * 0.25;

    let face_height = (chin.y - forehead.y).abs().max(GEOMETRY_EPSILON);
    let face_width = (right_outer.x - left_outer.x).abs().max(GEOMETRY_EPSILON);
    let eye_distance = (right_eye_center_x - left_eye_center_x).abs().max(GEOMETRY_EPSILON);

    let yaw = (nose_tip.x - eye_center_x) / eye_distance;
    let pitch = (nose_tip.y - eye_center_y) / face_height;

    let eye_x = (normalize_offset(left_iris.x, left_outer.x, left_inner.x)
        + normalize_offset(right_iris.x, right_outer.x, right_inner.x))
        * 0.5;
    let eye_y = (normalize_offset(left_iris.y, left_upper.y, left_lower.y)
        + normalize_offset(right_iris.y, right_upper.y, right_lower.y))
        * 0.5;

    let left_open = (left_lower.y - left_upper.y).abs() / (left_inner.x - left_outer.x).abs().max(GEOMETRY_EPSILON);
    let right_open =
        (right_lower.y - right_upper.y).abs() / (right_inner.x - right_outer.x).abs().max(GEOMETRY_EPSILON);
    let eye_openness = clamp((left_open + right_open) * 0.5, 0.0, 1.0);

    Some(FaceMetrics {
        yaw,
        pitch,
        eye_x,
        eye_y,
        eye_openness,
        face_scale: face_height * FACE_SCALE_HEIGHT_WEIGHT + face_width * FACE_SCALE_WIDTH_WEIGHT,
    })
}

/// Compute torso metrics from a body pose
///
/// Returns `None` when a shoulder or hip is missing or non-finite.
#[must_use]
pub fn compute_torso_metrics(landmarks: &[Landmark]) -> Option<TorsoMetrics> {
    let left_shoulder = landmark_at(landmarks, POSE_LEFT_SHOULDER)?;
    let right_shoulder = landmark_at(landmarks, POSE_RIGHT_SHOULDER)?;
    let left_hip = landmark_at(landmarks, POSE_LEFT_HIP)?;
    let right_hip = landmark_at(landmarks, POSE_RIGHT_HIP)?;
    let joints = [left_shoulder, right_shoulder, left_hip, right_hip];

    let visibility_score = joints
        .iter()
        .map(|p| p.visibility_or_zero())
        .fold(f64::INFINITY, f64::min);

    let shoulder_width = left_shoulder.distance(right_shoulder);
    let torso_height = (left_shoulder.distance(left_hip) + right_shoulder.distance(right_hip)) * 0.5;
    let hip_width = left_hip.distance(right_hip);

    Some(TorsoMetrics {
        torso_scale: shoulder_width * TORSO_SHOULDER_WEIGHT
            + torso_height * TORSO_HEIGHT_WEIGHT
            + hip_width * TORSO_HIP_WEIGHT,
        visibility_score,
        center_x: joints.iter().map(|p| p.x).sum::<f64>() * 0.25,
        center_y: joints.iter().map(|p| p.y).sum::<f64>() * 0.25,
    })
}
