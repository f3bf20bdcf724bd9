//! Hysteretic focus state machine.
//!
//! [`step_focus_state`] is a pure transition function: it consumes the
//! previous [`FocusState`] snapshot and one tick of input and returns the
//! next snapshot plus an optional [`RedirectAction`]. Two dwell timers
//! gate the transitions:
//!
//! - `off_focus_ms` grows under off-focus evidence and decays otherwise;
//!   reaching `off_focus_open_ms` opens the redirect.
//! - `refocus_ms` grows under strong focus while the redirect is open;
//!   reaching `refocus_close_ms` closes it.
//!
//! `min_open_ms` and `reopen_guard_ms` keep the redirect from thrashing.

use crate::{
    calibration::CalibrationSnapshot,
    classifier::FocusSignals,
    constants::DEFAULT_MAX_TICK_MS,
    utils::{clamp, finite_or},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Calibrating,
    Focused,
    OffFocusPending,
    OffFocusOpened,
    RefocusPending,
}

impl Phase {
    /// Stable snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calibrating => "calibrating",
            Self::Focused => "focused",
            Self::OffFocusPending => "off_focus_pending",
            Self::OffFocusOpened => "off_focus_opened",
            Self::RefocusPending => "refocus_pending",
        }
    }

    /// Phases in which a redirect may be open
    #[must_use]
    pub const fn allows_open_redirect(self) -> bool {
        matches!(self, Self::OffFocusOpened | Self::RefocusPending)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic reason for the current tick
///
/// Reasons never gate transitions. They are reported with open actions and
/// in the state trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusReason {
    NoSignal,
    LeftSeatLike,
    FaceAbsent,
    TorsoAbsent,
    PhoneLikeDown,
    LookAway,
    Focused,
    Calibrating,
}

impl FocusReason {
    /// Highest-priority reason for a set of signals
    #[must_use]
    pub fn from_signals(signals: Option<&FocusSignals>) -> Self {
        let Some(s) = signals else {
            return Self::NoSignal;
        };
        if s.left_seat_like {
            Self::LeftSeatLike
        } else if !s.face_present {
            Self::FaceAbsent
        } else if !s.torso_present {
            Self::TorsoAbsent
        } else if s.phone_like_down {
            Self::PhoneLikeDown
        } else if s.look_away {
            Self::LookAway
        } else {
            Self::Focused
        }
    }

    /// Stable snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSignal => "no_signal",
            Self::LeftSeatLike => "left_seat_like",
            Self::FaceAbsent => "face_absent",
            Self::TorsoAbsent => "torso_absent",
            Self::PhoneLikeDown => "phone_like_down",
            Self::LookAway => "look_away",
            Self::Focused => "focused",
            Self::Calibrating => "calibrating",
        }
    }
}

impl fmt::Display for FocusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dwell thresholds and evidence multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusMachineConfig {
    /// Off-focus dwell that opens the redirect
    pub off_focus_open_ms: f64,
    /// Refocus dwell that closes the redirect
    pub refocus_close_ms: f64,
    /// Minimum time a redirect stays open
    pub min_open_ms: f64,
    /// Minimum time between a close and the next open
    pub reopen_guard_ms: f64,
    pub hard_evidence_multiplier: f64,
    pub soft_evidence_multiplier: f64,
    pub evidence_decay_multiplier: f64,
    pub refocus_decay_multiplier: f64,
    /// Upper bound on a single tick's `dt`
    pub max_tick_ms: f64,
}

impl Default for FocusMachineConfig {
    fn default() -> Self {
        Self {
            off_focus_open_ms: 8000.0,
            refocus_close_ms: 3000.0,
            min_open_ms: 4000.0,
            reopen_guard_ms: 2000.0,
            hard_evidence_multiplier: 1.45,
            soft_evidence_multiplier: 1.0,
            evidence_decay_multiplier: 1.8,
            refocus_decay_multiplier: 1.6,
            max_tick_ms: DEFAULT_MAX_TICK_MS,
        }
    }
}

impl FocusMachineConfig {
    /// Non-finite fields fall back to defaults; negatives are floored at 0
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let non_negative = |value: f64, fallback: f64| finite_or(value, fallback).max(0.0);
        Self {
            off_focus_open_ms: non_negative(self.off_focus_open_ms, d.off_focus_open_ms),
            refocus_close_ms: non_negative(self.refocus_close_ms, d.refocus_close_ms),
            min_open_ms: non_negative(self.min_open_ms, d.min_open_ms),
            reopen_guard_ms: non_negative(self.reopen_guard_ms, d.reopen_guard_ms),
            hard_evidence_multiplier: non_negative(self.hard_evidence_multiplier, d.hard_evidence_multiplier),
            soft_evidence_multiplier: non_negative(self.soft_evidence_multiplier, d.soft_evidence_multiplier),
            evidence_decay_multiplier: non_negative(self.evidence_decay_multiplier, d.evidence_decay_multiplier),
            refocus_decay_multiplier: non_negative(self.refocus_decay_multiplier, d.refocus_decay_multiplier),
            max_tick_ms: non_negative(self.max_tick_ms, d.max_tick_ms),
        }
    }
}

/// Machine snapshot, replaced on every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusState {
    pub phase: Phase,
    pub off_focus_ms: f64,
    pub refocus_ms: f64,
    pub redirect_open: bool,
    pub last_reason: FocusReason,
    pub calibration: CalibrationSnapshot,
    /// `None` until the first open
    pub last_opened_at: Option<f64>,
    /// `None` until the first close
    pub last_closed_at: Option<f64>,
    /// Timestamp of the last processed tick
    pub last_tick_ms: Option<f64>,
}

impl Default for FocusState {
    fn default() -> Self {
        Self {
            phase: Phase::Calibrating,
            off_focus_ms: 0.0,
            refocus_ms: 0.0,
            redirect_open: false,
            last_reason: FocusReason::Calibrating,
            calibration: CalibrationSnapshot::default(),
            last_opened_at: None,
            last_closed_at: None,
            last_tick_ms: None,
        }
    }
}

impl FocusState {
    /// Calibrated state resting in `focused`
    #[must_use]
    pub fn ready() -> Self {
        Self {
            phase: Phase::Focused,
            last_reason: FocusReason::Focused,
            calibration: CalibrationSnapshot::completed(0),
            ..Self::default()
        }
    }

    /// Correction applied when an open action could not be carried out
    ///
    /// Clears the redirect flag and rolls `off_focus_ms` back so normal
    /// accumulation retries the open a little later.
    #[must_use]
    pub fn after_open_failure(&self, rollback_ms: f64) -> Self {
        Self {
            redirect_open: false,
            phase: Phase::OffFocusPending,
            refocus_ms: 0.0,
            off_focus_ms: (self.off_focus_ms - finite_or(rollback_ms, 0.0).max(0.0)).max(0.0),
            ..*self
        }
    }

    /// Adopt a redirect that was already open before the session started
    #[must_use]
    pub fn with_redirect_synced(&self, now_ms: f64) -> Self {
        Self {
            redirect_open: true,
            phase: Phase::OffFocusOpened,
            refocus_ms: 0.0,
            last_opened_at: Some(now_ms),
            ..*self
        }
    }

    /// Calibration has finished
    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.calibration.complete
    }
}

/// Recommendation for the redirect executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectAction {
    OpenRedirect { reason: FocusReason },
    CloseRedirect,
}

impl RedirectAction {
    /// Wire name of the action
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OpenRedirect { .. } => "open_redirect",
            Self::CloseRedirect => "close_redirect",
        }
    }
}

/// Input for one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput<'a> {
    pub dt_ms: f64,
    pub now_ms: f64,
    /// `None` when no classification is available for this tick
    pub signals: Option<&'a FocusSignals>,
    /// Replaces the carried calibration snapshot when present
    pub calibration: Option<CalibrationSnapshot>,
}

/// Next snapshot and optional action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: FocusState,
    pub action: Option<RedirectAction>,
}

/// Evidence class of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evidence {
    Hard,
    Soft,
    Neutral,
}

impl Evidence {
    fn classify(signals: Option<&FocusSignals>) -> Self {
        match signals {
            None => Self::Hard,
            Some(s) if !s.face_present || !s.torso_present || s.left_seat_like => Self::Hard,
            Some(s) if s.look_away || s.phone_like_down => Self::Soft,
            Some(_) => Self::Neutral,
        }
    }
}

fn is_strong_focus(signals: Option<&FocusSignals>) -> bool {
    signals.is_some_and(FocusSignals::is_strong_focus)
}

fn accumulate_off_focus(off_focus_ms: f64, dt_ms: f64, evidence: Evidence, config: &FocusMachineConfig) -> f64 {
    let next = match evidence {
        Evidence::Hard => off_focus_ms + dt_ms * config.hard_evidence_multiplier,
        Evidence::Soft => off_focus_ms + dt_ms * config.soft_evidence_multiplier,
        Evidence::Neutral => off_focus_ms - dt_ms * config.evidence_decay_multiplier,
    };
    next.max(0.0)
}

/// Advance the machine by one tick
///
/// Total over its input: `dt_ms` is clamped to `[0, max_tick_ms]` (non-finite
/// becomes 0) and a non-finite `now_ms` reuses the previous tick's time.
#[must_use]
pub fn step_focus_state(prev: &FocusState, input: &TickInput<'_>, config: &FocusMachineConfig) -> Transition {
    let config = config.sanitized();
    let dt_ms = clamp(finite_or(input.dt_ms, 0.0), 0.0, config.max_tick_ms);
    let now_ms = if input.now_ms.is_finite() {
        input.now_ms
    } else {
        prev.last_tick_ms.unwrap_or(0.0)
    };

    let mut state = FocusState {
        calibration: input.calibration.unwrap_or(prev.calibration),
        last_tick_ms: Some(now_ms),
        ..*prev
    };
    state.last_reason = if state.calibration.complete {
        FocusReason::from_signals(input.signals)
    } else {
        FocusReason::Calibrating
    };

    if !state.calibration.complete {
        state.phase = Phase::Calibrating;
        state.off_focus_ms = 0.0;
        state.refocus_ms = 0.0;
        return Transition { state, action: None };
    }

    let evidence = Evidence::classify(input.signals);
    state.off_focus_ms = accumulate_off_focus(finite_or(state.off_focus_ms, 0.0), dt_ms, evidence, &config);

    if !state.redirect_open {
        state.refocus_ms = 0.0;
        let reopen_ready = state
            .last_closed_at
            .map_or(true, |closed| now_ms - closed >= config.reopen_guard_ms);

        if state.off_focus_ms >= config.off_focus_open_ms && reopen_ready {
            state.off_focus_ms = config.off_focus_open_ms;
            state.redirect_open = true;
            state.last_opened_at = Some(now_ms);
            state.phase = Phase::OffFocusOpened;
            return Transition {
                state,
                action: Some(RedirectAction::OpenRedirect {
                    reason: state.last_reason,
                }),
            };
        }

        state.off_focus_ms = clamp(state.off_focus_ms, 0.0, config.off_focus_open_ms);
        state.phase = if state.off_focus_ms > 0.0 {
            Phase::OffFocusPending
        } else {
            Phase::Focused
        };
        return Transition { state, action: None };
    }

    state.off_focus_ms = clamp(state.off_focus_ms, 0.0, config.off_focus_open_ms);

    let refocus_ms = finite_or(state.refocus_ms, 0.0);
    state.refocus_ms = if is_strong_focus(input.signals) {
        refocus_ms + dt_ms
    } else {
        refocus_ms - dt_ms * config.refocus_decay_multiplier
    };
    state.refocus_ms = clamp(state.refocus_ms, 0.0, config.refocus_close_ms);

    state.phase = if state.refocus_ms > 0.0 {
        Phase::RefocusPending
    } else {
        Phase::OffFocusOpened
    };

    let open_long_enough = state
        .last_opened_at
        .map_or(true, |opened| now_ms - opened >= config.min_open_ms);
    if state.refocus_ms >= config.refocus_close_ms && open_long_enough {
        state.redirect_open = false;
        state.phase = Phase::Focused;
        state.off_focus_ms = 0.0;
        state.refocus_ms = 0.0;
        state.last_closed_at = Some(now_ms);
        return Transition {
            state,
            action: Some(RedirectAction::CloseRedirect),
        };
    }

    Transition { state, action: None }
}
