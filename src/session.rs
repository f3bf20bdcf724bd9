//! Per-session context driving the tick pipeline.
//!
//! A [`FocusSession`] owns everything that persists across frames: the
//! metric smoother, the calibration engine, the frozen baseline and
//! thresholds, and the current [`FocusState`]. Each call to
//! [`FocusSession::tick`] runs one frame through
//! extraction, smoothing, calibration, classification and the state machine,
//! and returns the action (if any) for the caller to dispatch.

use crate::{
    baseline::Baseline,
    calibration::{CalibrationEngine, CalibrationProgress, CalibrationSnapshot},
    classifier::{classify_focus_signals, FocusSignals, PresenceOverride},
    config::Config,
    constants::{
        DEFAULT_FIRST_FRAME_DT_MS, DEFAULT_MAX_FRAME_DT_MS, DEFAULT_OPEN_FAILURE_ROLLBACK_MS,
        DEFAULT_TRACE_INTERVAL_MS,
    },
    landmarks::{Landmark, LandmarkFrame},
    metrics::{compute_face_metrics, compute_torso_metrics},
    redirect::{RedirectOutcome, RedirectStatus},
    smoother::MetricSmoother,
    state_machine::{step_focus_state, FocusMachineConfig, FocusState, RedirectAction, TickInput},
    thresholds::{build_adaptive_thresholds, SignalThresholds},
    utils::finite_or,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Frame clock and glue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Derive thresholds from calibration dispersion instead of using the static profile
    pub adaptive_thresholds: bool,
    /// `dt` assumed for the first frame
    pub first_frame_dt_ms: f64,
    /// Upper bound on the frame-to-frame `dt`
    pub max_frame_dt_ms: f64,
    /// Minimum session time between state traces
    pub trace_interval_ms: f64,
    /// Off-focus time given back after a failed open
    pub open_failure_rollback_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            adaptive_thresholds: false,
            first_frame_dt_ms: DEFAULT_FIRST_FRAME_DT_MS,
            max_frame_dt_ms: DEFAULT_MAX_FRAME_DT_MS,
            trace_interval_ms: DEFAULT_TRACE_INTERVAL_MS,
            open_failure_rollback_ms: DEFAULT_OPEN_FAILURE_ROLLBACK_MS,
        }
    }
}

/// Everything produced by one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub dt_ms: f64,
    pub signals: FocusSignals,
    pub calibration: CalibrationProgress,
    pub state: FocusState,
    pub action: Option<RedirectAction>,
}

/// Explicit per-session context
#[derive(Debug, Clone)]
pub struct FocusSession {
    default_baseline: Baseline,
    default_thresholds: SignalThresholds,
    machine_config: FocusMachineConfig,
    session_config: SessionConfig,
    smoother: MetricSmoother,
    calibration: CalibrationEngine,
    baseline: Baseline,
    thresholds: SignalThresholds,
    presence: PresenceOverride,
    state: FocusState,
    last_signals: Option<FocusSignals>,
    previous_frame_at: Option<f64>,
    last_trace_at: Option<f64>,
    pending_redirect_sync: bool,
}

impl FocusSession {
    /// Create a session with every parameter merged from `config`
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let thresholds = config.thresholds.sanitized();
        let baseline = config.baseline.sanitized();
        Self {
            default_baseline: baseline,
            default_thresholds: thresholds,
            machine_config: config.machine.sanitized(),
            session_config: config.session.clone(),
            smoother: MetricSmoother::new(&config.smoothing),
            calibration: CalibrationEngine::new(config.calibration.clone(), thresholds.min_pose_visibility),
            baseline,
            thresholds,
            presence: PresenceOverride::default(),
            state: FocusState::default(),
            last_signals: None,
            previous_frame_at: None,
            last_trace_at: None,
            pending_redirect_sync: false,
        }
    }

    /// Start the calibration window at `now_ms`
    pub fn start(&mut self, now_ms: f64) {
        self.calibration.start(now_ms);
        info!("Focus session started, calibrating");
    }

    /// Run one decoded frame
    pub fn tick(&mut self, frame: &LandmarkFrame) -> TickOutcome {
        self.tick_at(frame.t_ms, frame.face_points(), frame.pose_points())
    }

    /// Run one frame of raw landmarks captured at `now_ms`
    pub fn tick_at(&mut self, now_ms: f64, face: Option<&[Landmark]>, pose: Option<&[Landmark]>) -> TickOutcome {
        let dt_ms = self.frame_dt(now_ms);

        let face_metrics = face.and_then(compute_face_metrics);
        let torso_metrics = pose.and_then(compute_torso_metrics);
        let smoothed = self.smoother.step(face_metrics.as_ref(), torso_metrics.as_ref());

        let calibration = self.calibration.update(
            now_ms,
            face_metrics.is_some(),
            torso_metrics.as_ref(),
            &smoothed,
            &self.default_baseline,
        );
        if let CalibrationProgress::Finalized(baseline) = calibration {
            self.freeze_baseline(baseline);
        }

        // Only smoothed values reach the classifier; raw presence decides which
        let smoothed_face = face_metrics.map(|_| smoothed.face());
        let smoothed_torso = torso_metrics.map(|raw| smoothed.torso(raw.visibility_score));
        let signals = classify_focus_signals(
            smoothed_face.as_ref(),
            smoothed_torso.as_ref(),
            &self.baseline,
            &self.thresholds,
            self.presence,
        );

        let transition = step_focus_state(
            &self.state,
            &TickInput {
                dt_ms,
                now_ms,
                signals: Some(&signals),
                calibration: Some(self.calibration.snapshot(now_ms)),
            },
            &self.machine_config,
        );
        self.state = transition.state;
        self.last_signals = Some(signals);

        if self.pending_redirect_sync && self.state.is_calibrated() {
            self.pending_redirect_sync = false;
            if !self.state.redirect_open {
                self.state = self.state.with_redirect_synced(self.state.last_tick_ms.unwrap_or(0.0));
                info!("Adopted redirect that was open before calibration finished");
            }
        }

        self.maybe_trace(now_ms);

        TickOutcome {
            dt_ms,
            signals,
            calibration,
            state: self.state,
            action: transition.action,
        }
    }

    fn frame_dt(&mut self, now_ms: f64) -> f64 {
        let dt_ms = match self.previous_frame_at {
            Some(previous) if now_ms.is_finite() => {
                finite_or((now_ms - previous).min(self.session_config.max_frame_dt_ms), 0.0).max(0.0)
            }
            Some(_) => 0.0,
            None => self.session_config.first_frame_dt_ms,
        };
        if now_ms.is_finite() {
            self.previous_frame_at = Some(now_ms);
        }
        dt_ms
    }

    fn freeze_baseline(&mut self, baseline: Baseline) {
        self.baseline = baseline;
        if self.session_config.adaptive_thresholds {
            self.thresholds =
                build_adaptive_thresholds(self.calibration.samples(), &baseline, &self.default_thresholds);
            info!("Adaptive thresholds: {:?}", self.thresholds);
        }
    }

    fn maybe_trace(&mut self, now_ms: f64) {
        if !now_ms.is_finite() {
            return;
        }
        if let Some(last) = self.last_trace_at {
            if now_ms - last < self.session_config.trace_interval_ms {
                return;
            }
        }
        self.last_trace_at = Some(now_ms);

        let snapshot = self.calibration.snapshot(now_ms);
        debug!(
            "state: phase={}, off_focus_ms={}, refocus_ms={}, reason={}, redirect_open={}, \
             calibration={{complete={}, samples={}, remaining_ms={}, extended={}}}, signals={:?}",
            self.state.phase,
            self.state.off_focus_ms.round(),
            self.state.refocus_ms.round(),
            self.state.last_reason,
            self.state.redirect_open,
            snapshot.complete,
            snapshot.sample_count,
            snapshot.remaining_ms.round(),
            snapshot.extended,
            self.last_signals.map(|s| (
                s.face_present,
                s.torso_present,
                s.look_away,
                s.phone_like_down,
                s.left_seat_like,
                s.confidence
            )),
        );
    }

    /// Feed back the result of a dispatched action
    ///
    /// A failed open is undone in the state so accumulation retries it.
    pub fn apply_outcome(&mut self, outcome: &RedirectOutcome) {
        if !outcome.requires_open_rollback() || !self.state.redirect_open {
            return;
        }
        warn!("Redirect did not open, rolling back: {:?}", outcome);
        self.state = self
            .state
            .after_open_failure(self.session_config.open_failure_rollback_ms);
    }

    /// Adopt a redirect that the executor already tracks
    ///
    /// Deferred until calibration completes when the session is still
    /// calibrating.
    pub fn sync_initial_redirect(&mut self, status: RedirectStatus) {
        if !status.is_open {
            return;
        }
        if self.state.is_calibrated() {
            self.state = self.state.with_redirect_synced(self.state.last_tick_ms.unwrap_or(0.0));
        } else {
            self.pending_redirect_sync = true;
        }
    }

    /// Replace the raw presence decisions on later ticks
    pub fn set_presence_override(&mut self, presence: PresenceOverride) {
        self.presence = presence;
    }

    #[must_use]
    pub const fn state(&self) -> &FocusState {
        &self.state
    }

    /// Baseline in use; the configured defaults until calibration completes
    #[must_use]
    pub const fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    #[must_use]
    pub const fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn calibration_snapshot(&self, now_ms: f64) -> CalibrationSnapshot {
        self.calibration.snapshot(now_ms)
    }

    #[must_use]
    pub const fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }

    #[must_use]
    pub const fn last_signals(&self) -> Option<&FocusSignals> {
        self.last_signals.as_ref()
    }

    #[must_use]
    pub const fn is_redirect_sync_pending(&self) -> bool {
        self.pending_redirect_sync
    }
}
