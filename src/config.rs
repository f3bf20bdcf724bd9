//! Configuration management for the focus guard

use crate::{
    baseline::Baseline,
    calibration::CalibrationConfig,
    redirect::RedirectConfig,
    session::SessionConfig,
    smoother::SmoothingConfig,
    state_machine::FocusMachineConfig,
    thresholds::SignalThresholds,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
///
/// Every section falls back to its built-in defaults, so a partial file
/// only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reference values used until calibration completes
    pub baseline: Baseline,

    /// Signal classifier sensitivity
    pub thresholds: SignalThresholds,

    /// Dwell thresholds and multipliers
    pub machine: FocusMachineConfig,

    /// Calibration window
    pub calibration: CalibrationConfig,

    /// Per-channel smoothing rates
    pub smoothing: SmoothingConfig,

    /// Redirect window
    pub redirect: RedirectConfig,

    /// Frame clock and session glue
    pub session: SessionConfig,
}

fn require(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::ConfigError(message.into()))
    }
}

fn require_positive(value: f64, name: &str) -> Result<()> {
    require(value.is_finite() && value > 0.0, format!("{name} must be greater than 0"))
}

fn require_non_negative(value: f64, name: &str) -> Result<()> {
    require(value.is_finite() && value >= 0.0, format!("{name} must not be negative"))
}

fn require_unit(value: f64, name: &str) -> Result<()> {
    require((0.0..=1.0).contains(&value), format!("{name} must be between 0.0 and 1.0"))
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Dwell timers
        let m = &self.machine;
        require_positive(m.off_focus_open_ms, "off_focus_open_ms")?;
        require_positive(m.refocus_close_ms, "refocus_close_ms")?;
        require_positive(m.max_tick_ms, "max_tick_ms")?;
        require_non_negative(m.min_open_ms, "min_open_ms")?;
        require_non_negative(m.reopen_guard_ms, "reopen_guard_ms")?;
        require_non_negative(m.hard_evidence_multiplier, "hard_evidence_multiplier")?;
        require_non_negative(m.soft_evidence_multiplier, "soft_evidence_multiplier")?;
        require_non_negative(m.evidence_decay_multiplier, "evidence_decay_multiplier")?;
        require_non_negative(m.refocus_decay_multiplier, "refocus_decay_multiplier")?;

        // Calibration
        let c = &self.calibration;
        require(c.min_samples > 0, "Calibration min_samples must be greater than 0")?;
        require(c.sample_capacity > 0, "Calibration sample_capacity must be greater than 0")?;
        require_non_negative(c.base_duration_ms, "Calibration base_duration_ms")?;
        require_non_negative(c.extension_ms, "Calibration extension_ms")?;

        // Smoothing
        for (name, channel) in self.smoothing.channels() {
            for (rate_name, rate) in [("alpha_rise", channel.alpha_rise), ("alpha_fall", channel.alpha_fall)] {
                require(
                    rate > 0.0 && rate <= 1.0,
                    format!("Smoothing {name}.{rate_name} must be in (0.0, 1.0]"),
                )?;
            }
        }

        // Thresholds
        let t = &self.thresholds;
        for (name, value) in [
            ("yaw_away_delta", t.yaw_away_delta),
            ("eye_x_away_delta", t.eye_x_away_delta),
            ("look_score_threshold", t.look_score_threshold),
            ("look_extreme_yaw", t.look_extreme_yaw),
            ("look_extreme_eye", t.look_extreme_eye),
            ("pitch_down_delta", t.pitch_down_delta),
            ("eye_y_down_delta", t.eye_y_down_delta),
            ("torso_down_delta", t.torso_down_delta),
            ("body_shift_x_delta", t.body_shift_x_delta),
            ("body_shift_y_delta", t.body_shift_y_delta),
        ] {
            require_positive(value, name)?;
        }
        require_unit(t.min_pose_visibility, "min_pose_visibility")?;
        require_unit(t.torso_present_ratio, "torso_present_ratio")?;
        require_unit(t.torso_leave_ratio, "torso_leave_ratio")?;
        require_unit(t.min_eye_openness, "min_eye_openness")?;
        require_non_negative(t.min_torso_scale, "min_torso_scale")?;
        require(
            t.torso_leave_ratio <= t.torso_present_ratio,
            "torso_leave_ratio must not exceed torso_present_ratio",
        )?;

        // Session
        let s = &self.session;
        require_non_negative(s.first_frame_dt_ms, "first_frame_dt_ms")?;
        require_positive(s.max_frame_dt_ms, "max_frame_dt_ms")?;
        require_non_negative(s.trace_interval_ms, "trace_interval_ms")?;
        require_non_negative(s.open_failure_rollback_ms, "open_failure_rollback_ms")?;

        // Redirect
        require(!self.redirect.url.trim().is_empty(), "Redirect URL must not be empty")?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Focus Guard Configuration

# Reference values used until calibration completes
baseline:
  yaw: 0.0
  pitch: 0.0
  eye_x: 0.0
  eye_y: 0.0
  torso_scale: 0.18
  torso_center_x: 0.5
  torso_center_y: 0.6
  face_scale: 0.24
  eye_openness: 0.03

# Signal classifier sensitivity
thresholds:
  min_pose_visibility: 0.35
  yaw_away_delta: 0.16
  eye_x_away_delta: 0.14
  look_score_threshold: 1.42
  look_extreme_yaw: 1.5
  look_extreme_eye: 1.22
  pitch_down_delta: 0.14
  eye_y_down_delta: 0.1
  torso_down_delta: 0.055
  torso_present_ratio: 0.55
  torso_leave_ratio: 0.45
  min_torso_scale: 0.075
  body_shift_x_delta: 0.2
  body_shift_y_delta: 0.16
  min_eye_openness: 0.012

# Focus state machine
machine:
  off_focus_open_ms: 8000.0
  refocus_close_ms: 3000.0
  min_open_ms: 4000.0
  reopen_guard_ms: 2000.0
  hard_evidence_multiplier: 1.45
  soft_evidence_multiplier: 1.0
  evidence_decay_multiplier: 1.8
  refocus_decay_multiplier: 1.6
  max_tick_ms: 200.0

# Calibration window
calibration:
  base_duration_ms: 5000.0
  extension_ms: 3000.0
  min_samples: 45
  sample_capacity: 1200

# Per-channel smoothing (rise is applied when the value increases)
smoothing:
  yaw: { initial: 0.0, alpha_rise: 0.3, alpha_fall: 0.13 }
  pitch: { initial: 0.0, alpha_rise: 0.28, alpha_fall: 0.13 }
  eye_x: { initial: 0.0, alpha_rise: 0.28, alpha_fall: 0.14 }
  eye_y: { initial: 0.0, alpha_rise: 0.28, alpha_fall: 0.14 }
  torso_scale: { initial: 0.18, alpha_rise: 0.26, alpha_fall: 0.16 }
  torso_center_x: { initial: 0.5, alpha_rise: 0.2, alpha_fall: 0.15 }
  torso_center_y: { initial: 0.6, alpha_rise: 0.2, alpha_fall: 0.15 }
  face_scale: { initial: 0.24, alpha_rise: 0.24, alpha_fall: 0.14 }
  eye_openness: { initial: 0.03, alpha_rise: 0.24, alpha_fall: 0.18 }

# Redirect window
redirect:
  url: "https://careers.mcdonalds.com/"
  profile_dir: "focusguard-browser-profile"
  browser_path: null

# Session glue
session:
  adaptive_thresholds: false
  first_frame_dt_ms: 16.7
  max_frame_dt_ms: 100.0
  trace_interval_ms: 1400.0
  open_failure_rollback_ms: 450.0
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.machine.off_focus_open_ms = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.smoothing.yaw.alpha_rise = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.thresholds.torso_leave_ratio = 0.6;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.min_samples = 0;
        assert!(config.validate().is_err());
    }
}
