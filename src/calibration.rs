//! One-shot calibration that derives the personalized baseline.
//!
//! The engine collects smoothed samples while both a face and a sufficiently
//! visible torso are in view. When the window elapses it either finalizes,
//! or, if too few samples arrived, extends the window exactly once.

use crate::{
    baseline::Baseline,
    constants::{
        DEFAULT_CALIBRATION_DURATION_MS, DEFAULT_CALIBRATION_EXTENSION_MS, DEFAULT_CALIBRATION_SAMPLE_CAPACITY,
        DEFAULT_MIN_CALIBRATION_SAMPLES,
    },
    metrics::TorsoMetrics,
    smoother::SmoothedMetrics,
    utils::{finite_or, median_or},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Calibration window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Initial window length
    pub base_duration_ms: f64,
    /// One-time extension when too few samples arrived
    pub extension_ms: f64,
    /// Samples required to finalize without extending
    pub min_samples: usize,
    /// Per-channel buffer capacity; oldest samples are dropped beyond it
    pub sample_capacity: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            base_duration_ms: DEFAULT_CALIBRATION_DURATION_MS,
            extension_ms: DEFAULT_CALIBRATION_EXTENSION_MS,
            min_samples: DEFAULT_MIN_CALIBRATION_SAMPLES,
            sample_capacity: DEFAULT_CALIBRATION_SAMPLE_CAPACITY,
        }
    }
}

/// Bounded FIFO sample buffers, one per calibrated channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationSamples {
    pub yaw: VecDeque<f64>,
    pub pitch: VecDeque<f64>,
    pub eye_x: VecDeque<f64>,
    pub eye_y: VecDeque<f64>,
    pub torso_scale: VecDeque<f64>,
    pub torso_center_x: VecDeque<f64>,
    pub torso_center_y: VecDeque<f64>,
}

fn push_bounded(buffer: &mut VecDeque<f64>, value: f64, capacity: usize) {
    if !value.is_finite() || capacity == 0 {
        return;
    }
    if buffer.len() >= capacity {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

fn median_of(buffer: &VecDeque<f64>, fallback: f64) -> f64 {
    let values: Vec<f64> = buffer.iter().copied().collect();
    median_or(&values, fallback)
}

impl CalibrationSamples {
    /// Record one smoothed observation into every buffer
    pub fn push(&mut self, smoothed: &SmoothedMetrics, capacity: usize) {
        push_bounded(&mut self.yaw, smoothed.yaw, capacity);
        push_bounded(&mut self.pitch, smoothed.pitch, capacity);
        push_bounded(&mut self.eye_x, smoothed.eye_x, capacity);
        push_bounded(&mut self.eye_y, smoothed.eye_y, capacity);
        push_bounded(&mut self.torso_scale, smoothed.torso_scale, capacity);
        push_bounded(&mut self.torso_center_x, smoothed.torso_center_x, capacity);
        push_bounded(&mut self.torso_center_y, smoothed.torso_center_y, capacity);
    }

    /// Number of accepted observations (length of the yaw buffer)
    #[must_use]
    pub fn len(&self) -> usize {
        self.yaw.len()
    }

    /// No observation accepted yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.yaw.is_empty()
    }

    /// Copy a buffer into a contiguous vector
    #[must_use]
    pub fn values(buffer: &VecDeque<f64>) -> Vec<f64> {
        buffer.iter().copied().collect()
    }
}

/// Baseline from buffer medians, using `defaults` for empty buffers
///
/// Channels that are not calibrated (face scale, eye openness) keep their
/// default reference.
#[must_use]
pub fn baseline_from_samples(samples: &CalibrationSamples, defaults: &Baseline) -> Baseline {
    Baseline {
        yaw: median_of(&samples.yaw, defaults.yaw),
        pitch: median_of(&samples.pitch, defaults.pitch),
        eye_x: median_of(&samples.eye_x, defaults.eye_x),
        eye_y: median_of(&samples.eye_y, defaults.eye_y),
        torso_scale: median_of(&samples.torso_scale, defaults.torso_scale),
        torso_center_x: median_of(&samples.torso_center_x, defaults.torso_center_x),
        torso_center_y: median_of(&samples.torso_center_y, defaults.torso_center_y),
        face_scale: defaults.face_scale,
        eye_openness: defaults.eye_openness,
    }
}

/// Calibration status as seen by the focus state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSnapshot {
    pub complete: bool,
    pub sample_count: usize,
    pub remaining_ms: f64,
    pub extended: bool,
}

impl Default for CalibrationSnapshot {
    fn default() -> Self {
        Self {
            complete: false,
            sample_count: 0,
            remaining_ms: DEFAULT_CALIBRATION_DURATION_MS,
            extended: false,
        }
    }
}

impl CalibrationSnapshot {
    /// A finished calibration with no time remaining
    #[must_use]
    pub const fn completed(sample_count: usize) -> Self {
        Self {
            complete: true,
            sample_count,
            remaining_ms: 0.0,
            extended: false,
        }
    }
}

/// Result of feeding one frame into the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationProgress {
    /// Window still open
    Collecting { sample_count: usize },
    /// Window elapsed with too few samples and was extended
    Extended { sample_count: usize, duration_ms: f64 },
    /// Baseline computed on this frame
    Finalized(Baseline),
    /// Calibration finished on an earlier frame
    AlreadyComplete,
}

/// Calibration engine for one session
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    config: CalibrationConfig,
    min_pose_visibility: f64,
    started_at: Option<f64>,
    duration_ms: f64,
    extended: bool,
    samples: CalibrationSamples,
    baseline: Option<Baseline>,
}

impl CalibrationEngine {
    /// Create an engine that accepts samples when torso visibility is at least `min_pose_visibility`
    #[must_use]
    pub fn new(config: CalibrationConfig, min_pose_visibility: f64) -> Self {
        let duration_ms = finite_or(config.base_duration_ms, DEFAULT_CALIBRATION_DURATION_MS).max(0.0);
        Self {
            config,
            min_pose_visibility,
            started_at: None,
            duration_ms,
            extended: false,
            samples: CalibrationSamples::default(),
            baseline: None,
        }
    }

    /// Start the window at `now_ms` unless it already started
    pub fn start(&mut self, now_ms: f64) {
        if self.started_at.is_none() && now_ms.is_finite() {
            self.started_at = Some(now_ms);
        }
    }

    /// Feed one frame
    ///
    /// `face_present` and `torso` are the raw detections of this frame;
    /// `smoothed` holds the values that get sampled. Once finalized the
    /// engine ignores further input.
    pub fn update(
        &mut self,
        now_ms: f64,
        face_present: bool,
        torso: Option<&TorsoMetrics>,
        smoothed: &SmoothedMetrics,
        defaults: &Baseline,
    ) -> CalibrationProgress {
        if self.baseline.is_some() {
            return CalibrationProgress::AlreadyComplete;
        }

        self.start(now_ms);

        let torso_valid =
            torso.is_some_and(|t| finite_or(t.visibility_score, 0.0) >= self.min_pose_visibility);
        if face_present && torso_valid {
            self.samples.push(smoothed, self.config.sample_capacity);
        }

        let sample_count = self.samples.len();
        let Some(started_at) = self.started_at else {
            return CalibrationProgress::Collecting { sample_count };
        };
        if !now_ms.is_finite() || now_ms - started_at < self.duration_ms {
            return CalibrationProgress::Collecting { sample_count };
        }

        if sample_count >= self.config.min_samples || self.extended {
            let baseline = self.finalize(defaults);
            return CalibrationProgress::Finalized(baseline);
        }

        self.duration_ms += finite_or(self.config.extension_ms, DEFAULT_CALIBRATION_EXTENSION_MS).max(0.0);
        self.extended = true;
        warn!(
            "Calibration extended by {}ms (samples={})",
            self.config.extension_ms, sample_count
        );
        CalibrationProgress::Extended {
            sample_count,
            duration_ms: self.duration_ms,
        }
    }

    fn finalize(&mut self, defaults: &Baseline) -> Baseline {
        let baseline = baseline_from_samples(&self.samples, defaults);
        info!(
            "Calibration complete: samples={}, extended={}, baseline={:?}",
            self.samples.len(),
            self.extended,
            baseline
        );
        self.baseline = Some(baseline);
        baseline
    }

    /// Snapshot for the state machine at `now_ms`
    #[must_use]
    pub fn snapshot(&self, now_ms: f64) -> CalibrationSnapshot {
        let elapsed = match self.started_at {
            Some(started) if now_ms.is_finite() => (now_ms - started).max(0.0),
            _ => 0.0,
        };
        CalibrationSnapshot {
            complete: self.is_complete(),
            sample_count: self.samples.len(),
            remaining_ms: (self.duration_ms - elapsed).max(0.0),
            extended: self.extended,
        }
    }

    /// Baseline has been computed
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.baseline.is_some()
    }

    /// Finalized baseline, if any
    #[must_use]
    pub const fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Collected samples
    #[must_use]
    pub const fn samples(&self) -> &CalibrationSamples {
        &self.samples
    }

    /// Current window length
    #[must_use]
    pub const fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Window was extended
    #[must_use]
    pub const fn is_extended(&self) -> bool {
        self.extended
    }
}
