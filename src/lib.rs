//! Focus guard library: attention classification from face and pose landmarks.
//!
//! The library turns a per-frame stream of normalized landmarks into a
//! stable "is the user paying attention" decision and drives a hysteretic
//! state machine that opens a redirect window on sustained inattention and
//! closes it again on sustained focus.
//!
//! The per-frame pipeline consists of:
//! 1. Metric extraction from face mesh and pose landmarks
//! 2. Asymmetric exponential smoothing of every metric channel
//! 3. One-shot calibration of a personal baseline
//! 4. Signal classification against the baseline
//! 5. The focus state machine with dwell timers and anti-thrash guards
//!
//! # Examples
//!
//! ## Driving the state machine directly
//!
//! ```
//! use focus_guard::classifier::FocusSignals;
//! use focus_guard::state_machine::{step_focus_state, FocusMachineConfig, FocusState, TickInput};
//!
//! let config = FocusMachineConfig::default();
//! let away = FocusSignals::from_flags(false, false, false, false, true);
//! let mut state = FocusState::ready();
//! let mut opened = false;
//!
//! for tick in 1..=80 {
//!     let transition = step_focus_state(
//!         &state,
//!         &TickInput {
//!             dt_ms: 100.0,
//!             now_ms: f64::from(tick) * 100.0,
//!             signals: Some(&away),
//!             calibration: None,
//!         },
//!         &config,
//!     );
//!     opened |= transition.action.is_some();
//!     state = transition.state;
//! }
//!
//! assert!(opened);
//! assert!(state.redirect_open);
//! ```
//!
//! ## Running a session
//!
//! ```no_run
//! use focus_guard::{config::Config, landmarks::LandmarkFrame, session::FocusSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = FocusSession::new(&Config::default());
//! let frame = LandmarkFrame::from_json(r#"{"t_ms": 0.0, "face": null, "pose": null}"#)?;
//! session.start(frame.t_ms);
//!
//! let outcome = session.tick(&frame);
//! if let Some(action) = outcome.action {
//!     println!("{}", action.kind());
//! }
//! # Ok(())
//! # }
//! ```

/// Landmark points and per-frame landmark sets
pub mod landmarks;

/// Geometric metric extraction from landmarks
pub mod metrics;

/// Scalar filters used for temporal smoothing
pub mod filters;

/// Nine-channel metric smoother
pub mod smoother;

/// Personalized baseline
pub mod baseline;

/// Baseline calibration engine
pub mod calibration;

/// Classifier thresholds and adaptive threshold builder
pub mod thresholds;

/// Attention signal classifier
pub mod classifier;

/// Hysteretic focus state machine
pub mod state_machine;

/// Redirect executors and the asynchronous dispatcher
pub mod redirect;

/// Per-session pipeline context
pub mod session;

/// Numeric and statistics helpers
pub mod utils;

/// Error types and result handling
pub mod error;

/// Frame-replay application
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
