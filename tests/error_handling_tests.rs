//! Error handling tests for all modules

use focus_guard::{
    config::Config,
    error::{AppError, Result},
    landmarks::LandmarkFrame,
    redirect::{CloseResult, OpenResult, RedirectDispatcher, RedirectExecutor, RedirectOutcome, RedirectStatus},
    state_machine::{FocusReason, RedirectAction},
};
use std::time::Duration;

#[test]
fn test_frame_decode_errors() {
    // Not JSON at all
    let result = LandmarkFrame::from_json("frame 1");
    assert!(matches!(result, Err(AppError::Json(_))));

    // Missing timestamp
    let result = LandmarkFrame::from_json(r#"{"face": null}"#);
    assert!(result.is_err());

    // Landmark without coordinates
    let result = LandmarkFrame::from_json(r#"{"t_ms": 0, "face": [{"x": 0.5}]}"#);
    assert!(result.is_err());
}

#[test]
fn test_frame_decode_accepts_missing_detections() {
    let frame = LandmarkFrame::from_json(r#"{"t_ms": 12.5}"#).unwrap();
    assert_eq!(frame.t_ms, 12.5);
    assert!(frame.face.is_none());
    assert!(frame.pose.is_none());

    let frame = LandmarkFrame::from_json(r#"{"t_ms": 0, "pose": [{"x": 0.1, "y": 0.2, "visibility": 0.9}]}"#).unwrap();
    assert_eq!(frame.pose.unwrap()[0].visibility, Some(0.9));
}

#[test]
fn test_error_display() {
    let err = AppError::Redirect("browser exited".to_string());
    assert_eq!(err.to_string(), "Redirect error: browser exited");

    let err = AppError::ConfigError("bad value".to_string());
    assert_eq!(err.to_string(), "Configuration error: bad value");

    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(err.to_string().starts_with("IO error"));
}

#[test]
fn test_config_validation_errors() {
    let mut config = Config::default();
    config.session.max_frame_dt_ms = 0.0;
    match config.validate() {
        Err(AppError::ConfigError(msg)) => assert!(msg.contains("max_frame_dt_ms")),
        other => panic!("Expected ConfigError, got {other:?}"),
    }

    let mut config = Config::default();
    config.smoothing.torso_scale.alpha_fall = 0.0;
    match config.validate() {
        Err(AppError::ConfigError(msg)) => assert!(msg.contains("torso_scale.alpha_fall")),
        other => panic!("Expected ConfigError, got {other:?}"),
    }

    let mut config = Config::default();
    config.thresholds.yaw_away_delta = f64::NAN;
    assert!(config.validate().is_err());
}

/// Executor that fails every request
struct FailingExecutor;

impl RedirectExecutor for FailingExecutor {
    fn open_redirect(&mut self) -> Result<OpenResult> {
        Err(AppError::Redirect("spawn failed".to_string()))
    }

    fn close_redirect(&mut self) -> Result<CloseResult> {
        Err(AppError::Redirect("kill failed".to_string()))
    }

    fn redirect_state(&mut self) -> RedirectStatus {
        RedirectStatus::default()
    }
}

#[test]
fn test_executor_errors_become_outcomes() {
    let dispatcher = RedirectDispatcher::spawn(Box::new(FailingExecutor)).unwrap();
    let timeout = Duration::from_secs(5);

    assert!(dispatcher.dispatch(RedirectAction::OpenRedirect {
        reason: FocusReason::PhoneLikeDown
    }));
    assert_eq!(
        dispatcher.recv_outcome_timeout(timeout),
        Some(RedirectOutcome::OpenFailed("Redirect error: spawn failed".to_string()))
    );

    assert!(dispatcher.dispatch(RedirectAction::CloseRedirect));
    let outcome = dispatcher.recv_outcome_timeout(timeout).unwrap();
    assert!(matches!(outcome, RedirectOutcome::CloseFailed(_)));
    assert!(!outcome.requires_open_rollback());
}

#[test]
fn test_dispatcher_after_shutdown() {
    let mut dispatcher = RedirectDispatcher::spawn(Box::new(FailingExecutor)).unwrap();
    dispatcher.shutdown();

    assert!(!dispatcher.dispatch(RedirectAction::CloseRedirect));
    assert!(!dispatcher.is_busy());
    assert!(matches!(dispatcher.status(), Err(AppError::Redirect(_))));

    // Second shutdown is a no-op
    dispatcher.shutdown();
}
