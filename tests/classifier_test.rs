//! Signal classifier behavior against a fixed baseline


use focus_guard::{
    baseline::Baseline,
    classifier::{classify_focus_signals, FocusSignals, PresenceOverride},
    metrics::{compute_face_metrics, compute_torso_metrics, FaceMetrics, TorsoMetrics},
    thresholds::SignalThresholds,
};
use test_helpers::{baseline_face, baseline_torso, neutral_face, seated_pose};

fn classify(face: Option<&FaceMetrics>, torso: Option<&TorsoMetrics>, baseline: &Baseline) -> FocusSignals {
    classify_focus_signals(face, torso, baseline, &SignalThresholds::default(), PresenceOverride::default())
}

#[test]
fn test_phone_down_requires_pitch_and_eyes() {
    let baseline = Baseline::default();
    let torso = baseline_torso(&baseline, 0.2);

    let only_pitch = FaceMetrics {
        pitch: baseline.pitch + 0.22,
        eye_y: baseline.eye_y + 0.02,
        ..baseline_face(&baseline)
    };
    assert!(!classify(Some(&only_pitch), Some(&torso), &baseline).phone_like_down);

    let pitch_and_eyes = FaceMetrics {
        pitch: baseline.pitch + 0.24,
        eye_y: baseline.eye_y + 0.14,
        ..baseline_face(&baseline)
    };
    let signals = classify(Some(&pitch_and_eyes), Some(&torso), &baseline);
    assert!(signals.phone_like_down);
    assert!(signals.quality.pitch_norm >= 1.0);
    assert!(signals.quality.eye_down_norm >= 1.0);
}

#[test]
fn test_phone_down_with_torso_support() {
    let baseline = Baseline::default();
    // Norms just above 1 each; the slouch carries the decision
    let face = FaceMetrics {
        pitch: baseline.pitch + 0.15,
        eye_y: baseline.eye_y + 0.11,
        ..baseline_face(&baseline)
    };
    let upright = baseline_torso(&baseline, 0.2);
    assert!(!classify(Some(&face), Some(&upright), &baseline).phone_like_down);

    let slouched = TorsoMetrics {
        center_y: baseline.torso_center_y + 0.05,
        ..upright
    };
    assert!(classify(Some(&face), Some(&slouched), &baseline).phone_like_down);
}

#[test]
fn test_look_away_by_yaw_or_gaze() {
    let baseline = Baseline::default();
    let torso = baseline_torso(&baseline, 0.21);

    let by_yaw = FaceMetrics {
        yaw: baseline.yaw + 0.3,
        ..baseline_face(&baseline)
    };
    assert!(classify(Some(&by_yaw), Some(&torso), &baseline).look_away);

    let by_eye = FaceMetrics {
        eye_x: baseline.eye_x + 0.2,
        ..baseline_face(&baseline)
    };
    assert!(classify(Some(&by_eye), Some(&torso), &baseline).look_away);

    let by_negative_yaw = FaceMetrics {
        yaw: baseline.yaw - 0.3,
        ..baseline_face(&baseline)
    };
    assert!(classify(Some(&by_negative_yaw), Some(&torso), &baseline).look_away);
}

#[test]
fn test_left_seat_when_both_missing() {
    let baseline = Baseline {
        torso_scale: 0.2,
        ..Baseline::default()
    };
    let signals = classify(None, None, &baseline);
    assert!(!signals.face_present);
    assert!(!signals.torso_present);
    assert!(signals.left_seat_like);
    assert!(!signals.look_away);
    assert!((signals.confidence - 0.08).abs() < 1e-12);
}

#[test]
fn test_low_visibility_torso_is_absent() {
    let baseline = Baseline::default();
    let torso = TorsoMetrics {
        visibility_score: 0.2,
        ..baseline_torso(&baseline, 0.2)
    };
    let signals = classify(Some(&baseline_face(&baseline)), Some(&torso), &baseline);
    assert!(!signals.quality.raw_torso_visible_enough);
    assert!(!signals.torso_present);
    assert!(!signals.left_seat_like);
    assert!((signals.confidence - 0.6).abs() < 1e-12);
}

#[test]
fn test_torso_presence_scales_with_baseline() {
    let large_baseline = Baseline {
        torso_scale: 0.4,
        ..Baseline::default()
    };
    // 0.2 is below 0.4 * 0.55
    let torso = baseline_torso(&large_baseline, 0.2);
    let signals = classify(Some(&baseline_face(&large_baseline)), Some(&torso), &large_baseline);
    assert!(signals.quality.raw_torso_visible_enough);
    assert!(!signals.torso_present);
}

#[test]
fn test_extracted_metrics_classify_as_focused() {
    let face = compute_face_metrics(&neutral_face()).unwrap();
    let torso = compute_torso_metrics(&seated_pose(0.9)).unwrap();
    let baseline = Baseline {
        yaw: face.yaw,
        pitch: face.pitch,
        eye_x: face.eye_x,
        eye_y: face.eye_y,
        torso_scale: torso.torso_scale,
        torso_center_x: torso.center_x,
        torso_center_y: torso.center_y,
        face_scale: face.face_scale,
        eye_openness: face.eye_openness,
    };

    let signals = classify(Some(&face), Some(&torso), &baseline);
    assert!(signals.face_present && signals.torso_present);
    assert!(!signals.look_away && !signals.phone_like_down && !signals.left_seat_like);
    assert_eq!(signals.confidence, 1.0);
    assert!(signals.deltas.yaw_delta.abs() < 1e-12);
}

#[test]
fn test_override_can_force_presence() {
    let baseline = Baseline::default();
    let signals = classify_focus_signals(
        None,
        None,
        &baseline,
        &SignalThresholds::default(),
        PresenceOverride {
            face_present: Some(true),
            torso_present: Some(true),
        },
    );
    assert!(signals.face_present);
    assert!(signals.torso_present);
    assert!(!signals.left_seat_like);
    // Eye openness falls back to the baseline, so gaze stays reliable
    assert_eq!(signals.deltas.eye_openness, baseline.eye_openness);
    assert!(signals.quality.eye_tracking_reliable);
    // Raw detections still drive confidence; only the eye bonus applies
    assert!((signals.confidence - 0.18).abs() < 1e-12);
}

#[test]
fn test_non_finite_baseline_falls_back() {
    let baseline = Baseline {
        yaw: f64::NAN,
        torso_scale: f64::INFINITY,
        ..Baseline::default()
    };
    let face = baseline_face(&Baseline::default());
    let torso = baseline_torso(&Baseline::default(), 0.2);
    let signals = classify(Some(&face), Some(&torso), &baseline);
    assert!(signals.deltas.yaw_delta.is_finite());
    assert!(signals.torso_present);
    assert!(!signals.look_away);
}

#[test]
fn test_strong_focus_needs_presence_and_no_flags() {
    assert!(FocusSignals::focused().is_strong_focus());
    assert!(!FocusSignals::from_flags(false, true, false, false, false).is_strong_focus());
    assert!(!FocusSignals::from_flags(true, false, false, false, false).is_strong_focus());
    assert!(!FocusSignals::from_flags(true, true, true, false, false).is_strong_focus());
    assert!(!FocusSignals::from_flags(true, true, false, true, false).is_strong_focus());
    assert!(!FocusSignals::from_flags(true, true, false, false, true).is_strong_focus());

    let baseline = Baseline::default();
    let looking_away = FaceMetrics {
        yaw: baseline.yaw + 0.4,
        ..baseline_face(&baseline)
    };
    let torso = baseline_torso(&baseline, 0.2);
    assert!(classify(Some(&baseline_face(&baseline)), Some(&torso), &baseline).is_strong_focus());
    assert!(!classify(Some(&looking_away), Some(&torso), &baseline).is_strong_focus());
}
