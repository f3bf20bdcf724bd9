//! Focus state machine scenarios


use focus_guard::{
    calibration::CalibrationSnapshot,
    classifier::FocusSignals,
    state_machine::{step_focus_state, FocusMachineConfig, FocusReason, FocusState, Phase, RedirectAction, TickInput},
};
use test_helpers::{left_seat_signals, look_away_signals, run_ticks, step};

#[test]
fn test_short_off_focus_does_not_open() {
    let mut now = 0.0;
    let (state, actions) = run_ticks(FocusState::ready(), &mut now, 70, 100.0, &look_away_signals());

    assert!(actions.is_empty());
    assert!(!state.redirect_open);
    assert_eq!(state.phase, Phase::OffFocusPending);
    assert!(state.off_focus_ms < 8000.0);
}

#[test]
fn test_sustained_off_focus_opens() {
    let mut now = 0.0;
    let (state, actions) = run_ticks(FocusState::ready(), &mut now, 80, 100.0, &look_away_signals());

    assert_eq!(actions, vec!["open_redirect"]);
    assert!(state.redirect_open);
    assert_eq!(state.phase, Phase::OffFocusOpened);
    assert_eq!(state.last_opened_at, Some(8000.0));
}

#[test]
fn test_open_carries_reason() {
    let mut state = FocusState::ready();
    let mut now = 0.0;
    let signals = look_away_signals();
    for _ in 0..80 {
        now += 100.0;
        let next = step(&state, now, 100.0, &signals);
        if let Some(action) = next.action {
            assert_eq!(
                action,
                RedirectAction::OpenRedirect {
                    reason: FocusReason::LookAway
                }
            );
        }
        state = next.state;
    }
    assert!(state.redirect_open);
}

#[test]
fn test_hard_evidence_opens_exactly_once() {
    let mut state = FocusState::ready();
    let mut now = 0.0;
    let mut opened_at_tick = Vec::new();
    let signals = left_seat_signals();

    for tick in 1..=80 {
        now += 100.0;
        let next = step(&state, now, 100.0, &signals);
        if next.action.is_some() {
            opened_at_tick.push(tick);
        }
        state = next.state;
    }

    // 145ms of evidence per tick crosses 8000ms on tick 56
    assert_eq!(opened_at_tick, vec![56]);
    assert!(state.redirect_open);
    assert_eq!(state.off_focus_ms, 8000.0);
}

#[test]
fn test_min_open_guard_delays_close() {
    let mut now = 0.0;
    let (state, _) = run_ticks(FocusState::ready(), &mut now, 80, 100.0, &look_away_signals());
    let (state, actions) = run_ticks(state, &mut now, 30, 100.0, &FocusSignals::focused());

    assert!(actions.is_empty());
    assert!(state.redirect_open);
    assert_eq!(state.phase, Phase::RefocusPending);
    assert_eq!(state.refocus_ms, 3000.0);
}

#[test]
fn test_stable_refocus_closes() {
    let mut now = 0.0;
    let (state, _) = run_ticks(FocusState::ready(), &mut now, 80, 100.0, &look_away_signals());
    let (state, actions) = run_ticks(state, &mut now, 40, 100.0, &FocusSignals::focused());

    assert_eq!(actions, vec!["close_redirect"]);
    assert!(!state.redirect_open);
    assert_eq!(state.phase, Phase::Focused);
    assert_eq!(state.off_focus_ms, 0.0);
    assert_eq!(state.refocus_ms, 0.0);
    assert_eq!(state.last_closed_at, Some(12000.0));
}

#[test]
fn test_reopen_guard_blocks_thrash() {
    let mut now = 0.0;
    let (state, _) = run_ticks(FocusState::ready(), &mut now, 80, 100.0, &look_away_signals());
    let (mut state, _) = run_ticks(state, &mut now, 40, 100.0, &FocusSignals::focused());

    state.off_focus_ms = 8000.0;
    let blocked = step(&state, now + 500.0, 100.0, &look_away_signals());
    assert!(blocked.action.is_none());
    assert!(!blocked.state.redirect_open);
    assert_eq!(blocked.state.phase, Phase::OffFocusPending);
    assert!(blocked.state.off_focus_ms <= 8000.0);

    let reopened = step(&blocked.state, now + 2600.0, 100.0, &look_away_signals());
    assert_eq!(reopened.action.map(|a| a.kind()), Some("open_redirect"));
    assert!(reopened.state.redirect_open);
}

#[test]
fn test_refocus_decays_on_relapse() {
    let mut now = 0.0;
    let (state, _) = run_ticks(FocusState::ready(), &mut now, 80, 100.0, &look_away_signals());
    let (state, _) = run_ticks(state, &mut now, 10, 100.0, &FocusSignals::focused());
    assert_eq!(state.refocus_ms, 1000.0);

    let (state, _) = run_ticks(state, &mut now, 1, 100.0, &look_away_signals());
    assert!((state.refocus_ms - 840.0).abs() < 1e-9);
    assert_eq!(state.phase, Phase::RefocusPending);

    let (state, _) = run_ticks(state, &mut now, 10, 100.0, &look_away_signals());
    assert_eq!(state.refocus_ms, 0.0);
    assert_eq!(state.phase, Phase::OffFocusOpened);
    assert!(state.redirect_open);
}

#[test]
fn test_calibration_snapshot_from_input() {
    let away = left_seat_signals();
    let incomplete = step_focus_state(
        &FocusState::ready(),
        &TickInput {
            dt_ms: 100.0,
            now_ms: 100.0,
            signals: Some(&away),
            calibration: Some(CalibrationSnapshot::default()),
        },
        &FocusMachineConfig::default(),
    );
    assert_eq!(incomplete.state.phase, Phase::Calibrating);
    assert_eq!(incomplete.state.off_focus_ms, 0.0);

    let complete = step_focus_state(
        &FocusState::default(),
        &TickInput {
            dt_ms: 100.0,
            now_ms: 100.0,
            signals: Some(&away),
            calibration: Some(CalibrationSnapshot::completed(60)),
        },
        &FocusMachineConfig::default(),
    );
    assert_eq!(complete.state.phase, Phase::OffFocusPending);
    assert_eq!(complete.state.last_reason, FocusReason::LeftSeatLike);
    assert_eq!(complete.state.calibration.sample_count, 60);
}

#[test]
fn test_reason_priority() {
    let cases = [
        (FocusSignals::from_flags(false, false, true, true, true), FocusReason::LeftSeatLike),
        (FocusSignals::from_flags(false, true, true, true, false), FocusReason::FaceAbsent),
        (FocusSignals::from_flags(true, false, true, true, false), FocusReason::TorsoAbsent),
        (FocusSignals::from_flags(true, true, true, true, false), FocusReason::PhoneLikeDown),
        (FocusSignals::from_flags(true, true, true, false, false), FocusReason::LookAway),
        (FocusSignals::focused(), FocusReason::Focused),
    ];
    for (signals, expected) in cases {
        assert_eq!(FocusReason::from_signals(Some(&signals)), expected);
    }
    assert_eq!(FocusReason::from_signals(None), FocusReason::NoSignal);
}

#[test]
fn test_custom_config_thresholds() {
    let config = FocusMachineConfig {
        off_focus_open_ms: 1000.0,
        ..FocusMachineConfig::default()
    };
    let mut state = FocusState::ready();
    let signals = look_away_signals();
    let mut actions = 0;
    for tick in 1..=10 {
        let next = step_focus_state(
            &state,
            &TickInput {
                dt_ms: 100.0,
                now_ms: f64::from(tick) * 100.0,
                signals: Some(&signals),
                calibration: None,
            },
            &config,
        );
        actions += usize::from(next.action.is_some());
        state = next.state;
    }
    assert_eq!(actions, 1);
    assert!(state.redirect_open);
}
