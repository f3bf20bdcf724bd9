//! Browser controller and dispatcher behavior

use focus_guard::{
    error::{AppError, Result},
    redirect::{
        edge_candidate, launch_args, BrowserKind, BrowserRedirectController, CloseResult, DryRunExecutor, DRY_RUN_PID,
        OpenResult, ProcessLauncher, RedirectConfig, RedirectDispatcher, RedirectExecutor, RedirectOutcome,
        RedirectStatus,
    },
    state_machine::{FocusReason, RedirectAction},
};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver},
        Arc, Mutex,
    },
    time::Duration,
};

const OUTCOME_TIMEOUT: Duration = Duration::from_secs(5);

/// Launcher that records calls instead of touching the OS
#[derive(Debug, Default)]
struct FakeLauncher {
    next_pid: u32,
    spawned: Vec<(PathBuf, Vec<String>)>,
    terminated: Vec<u32>,
    running: Arc<Mutex<HashSet<u32>>>,
    external: Vec<String>,
    fail_spawn: bool,
}

impl ProcessLauncher for FakeLauncher {
    fn spawn(&mut self, program: &Path, args: &[String]) -> Result<u32> {
        if self.fail_spawn {
            return Err(AppError::Redirect("spawn failed".to_string()));
        }
        self.next_pid += 1;
        let pid = 1000 + self.next_pid;
        self.spawned.push((program.to_path_buf(), args.to_vec()));
        self.running.lock().unwrap().insert(pid);
        Ok(pid)
    }

    fn terminate(&mut self, pid: u32) -> Result<bool> {
        self.terminated.push(pid);
        Ok(self.running.lock().unwrap().remove(&pid))
    }

    fn is_running(&mut self, pid: u32) -> bool {
        self.running.lock().unwrap().contains(&pid)
    }

    fn open_external(&mut self, url: &str) -> Result<()> {
        self.external.push(url.to_string());
        Ok(())
    }
}

fn redirect_config() -> RedirectConfig {
    RedirectConfig {
        url: "https://example.com/focus".to_string(),
        profile_dir: PathBuf::from("profile"),
        browser_path: None,
    }
}

/// Controller on a machine where only Edge is installed
fn edge_controller(launcher: FakeLauncher) -> BrowserRedirectController<FakeLauncher> {
    let edge = edge_candidate(&HashMap::new());
    BrowserRedirectController::with_parts(
        redirect_config(),
        HashMap::new(),
        Box::new(move |p: &Path| p == edge.as_path()),
        launcher,
    )
}

fn open_action() -> RedirectAction {
    RedirectAction::OpenRedirect {
        reason: FocusReason::LookAway,
    }
}

#[test]
fn test_open_launches_app_window() {
    let mut controller = edge_controller(FakeLauncher::default());
    let result = controller.open_redirect().unwrap();

    assert_eq!(
        result,
        OpenResult {
            opened: true,
            pid: Some(1001),
            browser: BrowserKind::Edge.to_string(),
        }
    );
    let (program, args) = &controller.launcher().spawned[0];
    assert_eq!(program, &edge_candidate(&HashMap::new()));
    assert_eq!(args, &launch_args("https://example.com/focus", Path::new("profile")));
}

#[test]
fn test_duplicate_open_reports_tracked_pid() {
    let mut controller = edge_controller(FakeLauncher::default());
    controller.open_redirect().unwrap();
    let second = controller.open_redirect().unwrap();

    assert!(!second.opened);
    assert_eq!(second.pid, Some(1001));
    assert!(!second.is_failure());
    assert_eq!(controller.launcher().spawned.len(), 1);
}

#[test]
fn test_close_terminates_only_tracked_pid() {
    let launcher = FakeLauncher::default();
    // A browser the user started themselves
    launcher.running.lock().unwrap().insert(42);
    let mut controller = edge_controller(launcher);

    assert_eq!(controller.close_redirect().unwrap(), CloseResult { closed: false });
    assert!(controller.launcher().terminated.is_empty());

    controller.open_redirect().unwrap();
    assert_eq!(controller.close_redirect().unwrap(), CloseResult { closed: true });
    assert_eq!(controller.launcher().terminated, vec![1001]);
    assert!(controller.launcher().running.lock().unwrap().contains(&42));

    // Second close is a no-op
    assert!(!controller.close_redirect().unwrap().closed);
    assert_eq!(controller.launcher().terminated.len(), 1);
}

#[test]
fn test_exited_window_is_forgotten() {
    let launcher = FakeLauncher::default();
    let running = Arc::clone(&launcher.running);
    let mut controller = edge_controller(launcher);
    controller.open_redirect().unwrap();
    assert_eq!(
        controller.redirect_state(),
        RedirectStatus {
            is_open: true,
            pid: Some(1001)
        }
    );

    // The user closes the window by hand
    running.lock().unwrap().clear();
    assert_eq!(controller.redirect_state(), RedirectStatus::default());
    assert!(controller.launcher().terminated.is_empty());

    // A later open launches a fresh window
    let reopened = controller.open_redirect().unwrap();
    assert!(reopened.opened);
    assert_eq!(reopened.pid, Some(1002));
}

#[test]
fn test_open_after_window_exit_launches_again() {
    let launcher = FakeLauncher::default();
    let running = Arc::clone(&launcher.running);
    let mut controller = edge_controller(launcher);
    controller.open_redirect().unwrap();

    // Window closed by hand with no status poll in between
    running.lock().unwrap().clear();
    let reopened = controller.open_redirect().unwrap();

    assert!(reopened.opened);
    assert_eq!(reopened.pid, Some(1002));
    assert_eq!(controller.launcher().spawned.len(), 2);
    assert!(controller.launcher().terminated.is_empty());
    assert_eq!(
        controller.redirect_state(),
        RedirectStatus {
            is_open: true,
            pid: Some(1002)
        }
    );
}

#[test]
fn test_dry_run_duplicate_open_is_not_a_launch() {
    let mut executor = DryRunExecutor::new();
    assert!(executor.open_redirect().unwrap().opened);

    let second = executor.open_redirect().unwrap();
    assert!(!second.opened);
    assert!(!second.is_failure());
    assert!(!RedirectOutcome::Opened(second).requires_open_rollback());
    assert_eq!(executor.opens(), 1);
    assert_eq!(
        executor.redirect_state(),
        RedirectStatus {
            is_open: true,
            pid: Some(DRY_RUN_PID)
        }
    );

    assert!(executor.close_redirect().unwrap().closed);
    assert!(executor.open_redirect().unwrap().opened);
    assert_eq!((executor.opens(), executor.closes()), (2, 1));
}

#[test]
fn test_external_fallback_without_browser() {
    let mut controller = BrowserRedirectController::with_parts(
        redirect_config(),
        HashMap::new(),
        Box::new(|_: &Path| false),
        FakeLauncher::default(),
    );
    assert!(controller.resolve_browser().is_none());

    let result = controller.open_redirect().unwrap();
    assert!(result.opened);
    assert_eq!(result.pid, None);
    assert_eq!(result.browser, "external");
    assert_eq!(controller.launcher().external, vec!["https://example.com/focus"]);
    assert!(controller.launcher().spawned.is_empty());
    assert!(!controller.redirect_state().is_open);
}

#[test]
fn test_custom_browser_path_wins() {
    let config = RedirectConfig {
        browser_path: Some(PathBuf::from("/opt/browser/bin")),
        ..redirect_config()
    };
    let mut controller =
        BrowserRedirectController::with_parts(config, HashMap::new(), Box::new(|_: &Path| true), FakeLauncher::default());

    let result = controller.open_redirect().unwrap();
    assert_eq!(result.browser, BrowserKind::Custom.to_string());
    assert_eq!(controller.launcher().spawned[0].0, PathBuf::from("/opt/browser/bin"));
}

#[test]
fn test_spawn_error_propagates() {
    let launcher = FakeLauncher {
        fail_spawn: true,
        ..FakeLauncher::default()
    };
    let mut controller = edge_controller(launcher);
    assert!(controller.open_redirect().is_err());
    assert!(!controller.redirect_state().is_open);
}

#[test]
fn test_empty_url_rejected() {
    let config = RedirectConfig {
        url: "  ".to_string(),
        ..redirect_config()
    };
    let mut controller =
        BrowserRedirectController::with_parts(config, HashMap::new(), Box::new(|_: &Path| true), FakeLauncher::default());

    assert!(matches!(controller.open_redirect(), Err(AppError::InvalidInput(_))));
    assert!(controller.launcher().spawned.is_empty());
    assert!(controller.launcher().external.is_empty());
}

/// Executor whose opens block until the test releases them
struct GatedExecutor {
    gate: Receiver<()>,
    inner: DryRunExecutor,
}

impl RedirectExecutor for GatedExecutor {
    fn open_redirect(&mut self) -> Result<OpenResult> {
        let _ = self.gate.recv();
        self.inner.open_redirect()
    }

    fn close_redirect(&mut self) -> Result<CloseResult> {
        self.inner.close_redirect()
    }

    fn redirect_state(&mut self) -> RedirectStatus {
        self.inner.redirect_state()
    }
}

#[test]
fn test_dispatcher_drops_open_while_busy() {
    let (release, gate) = mpsc::channel();
    let dispatcher = RedirectDispatcher::spawn(Box::new(GatedExecutor {
        gate,
        inner: DryRunExecutor::new(),
    }))
    .unwrap();

    assert!(dispatcher.dispatch(open_action()));
    assert!(dispatcher.is_busy());
    assert!(!dispatcher.dispatch(open_action()));

    release.send(()).unwrap();
    let outcome = dispatcher.recv_outcome_timeout(OUTCOME_TIMEOUT).unwrap();
    assert!(matches!(outcome, RedirectOutcome::Opened(ref r) if r.opened));
    assert!(!dispatcher.is_busy());
    assert!(dispatcher.try_recv_outcomes().is_empty());
    assert!(dispatcher.status().unwrap().is_open);
}

#[test]
fn test_dispatcher_queues_close_while_busy() {
    let (release, gate) = mpsc::channel();
    let dispatcher = RedirectDispatcher::spawn(Box::new(GatedExecutor {
        gate,
        inner: DryRunExecutor::new(),
    }))
    .unwrap();

    assert!(dispatcher.dispatch(open_action()));
    assert!(dispatcher.dispatch(RedirectAction::CloseRedirect));
    assert!(dispatcher.is_busy());

    release.send(()).unwrap();
    let opened = dispatcher.recv_outcome_timeout(OUTCOME_TIMEOUT).unwrap();
    assert!(matches!(opened, RedirectOutcome::Opened(ref r) if r.opened));
    let closed = dispatcher.recv_outcome_timeout(OUTCOME_TIMEOUT).unwrap();
    assert_eq!(closed, RedirectOutcome::Closed(CloseResult { closed: true }));

    assert!(!dispatcher.is_busy());
    assert_eq!(dispatcher.status().unwrap(), RedirectStatus::default());
}

#[test]
fn test_dispatcher_round_trip() {
    let dispatcher = RedirectDispatcher::spawn(Box::new(DryRunExecutor::new())).unwrap();
    assert_eq!(dispatcher.status().unwrap(), RedirectStatus::default());

    assert!(dispatcher.dispatch(open_action()));
    let opened = dispatcher.recv_outcome_timeout(OUTCOME_TIMEOUT).unwrap();
    assert!(!opened.requires_open_rollback());

    assert!(dispatcher.dispatch(RedirectAction::CloseRedirect));
    let closed = dispatcher.recv_outcome_timeout(OUTCOME_TIMEOUT).unwrap();
    assert_eq!(closed, RedirectOutcome::Closed(CloseResult { closed: true }));
    assert!(dispatcher.try_recv_outcomes().is_empty());
}

#[test]
fn test_dispatcher_reports_open_errors() {
    let launcher = FakeLauncher {
        fail_spawn: true,
        ..FakeLauncher::default()
    };
    let dispatcher = RedirectDispatcher::spawn(Box::new(edge_controller(launcher))).unwrap();

    assert!(dispatcher.dispatch(open_action()));
    let outcome = dispatcher.recv_outcome_timeout(OUTCOME_TIMEOUT).unwrap();
    assert!(matches!(outcome, RedirectOutcome::OpenFailed(_)));
    assert!(outcome.requires_open_rollback());
}
