//! Redirect executor: opens and closes the intervention browser window.
//!
//! The state machine only recommends actions. [`RedirectExecutor`]
//! implementations carry them out, and [`RedirectDispatcher`] runs an
//! executor on a worker thread so the tick loop never waits on process
//! management.
//!
//! The executor owns a single tracked process. A duplicate open while one
//! is tracked reports the existing pid instead of launching again, and a
//! close with nothing tracked is a no-op.

use crate::{
    constants::{BROWSER_PROFILE_DIR, DEFAULT_REDIRECT_URL},
    error::{AppError, Result},
    state_machine::RedirectAction,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Result of an open request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenResult {
    /// A new window was launched
    pub opened: bool,
    /// Tracked process id, if any
    pub pid: Option<u32>,
    /// Browser that handled the request
    pub browser: String,
}

impl OpenResult {
    /// Neither launched nor already tracking a window
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !self.opened && self.pid.is_none()
    }
}

/// Result of a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseResult {
    pub closed: bool,
}

/// Tracked redirect as seen by the executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectStatus {
    pub is_open: bool,
    pub pid: Option<u32>,
}

/// Carries out redirect actions
pub trait RedirectExecutor: Send {
    /// Open the redirect, or report the tracked one
    fn open_redirect(&mut self) -> Result<OpenResult>;

    /// Close the tracked redirect
    fn close_redirect(&mut self) -> Result<CloseResult>;

    /// Current tracked redirect
    fn redirect_state(&mut self) -> RedirectStatus;
}

/// Redirect controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Page shown in the redirect window
    pub url: String,
    /// Browser profile directory used for the app window
    pub profile_dir: PathBuf,
    /// Browser executable that bypasses discovery
    pub browser_path: Option<PathBuf>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIRECT_URL.to_string(),
            profile_dir: PathBuf::from(BROWSER_PROFILE_DIR),
            browser_path: None,
        }
    }
}

/// Browser family used to show the redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Edge,
    /// Configured executable path
    Custom,
    /// System URL opener, untracked
    External,
}

impl BrowserKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Edge => "edge",
            Self::Custom => "custom",
            Self::External => "external",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A browser executable found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBrowser {
    pub kind: BrowserKind,
    pub executable: PathBuf,
}

const PROGRAM_FILES_FALLBACK: &str = "C:\\Program Files";
const PROGRAM_FILES_X86_FALLBACK: &str = "C:\\Program Files (x86)";

fn env_dir(env: &HashMap<String, String>, key: &str, fallback: &str) -> PathBuf {
    PathBuf::from(env.get(key).filter(|v| !v.is_empty()).map_or(fallback, String::as_str))
}

/// Chrome install locations in lookup order
#[must_use]
pub fn chrome_candidates(env: &HashMap<String, String>) -> Vec<PathBuf> {
    let chrome = |root: PathBuf| root.join("Google").join("Chrome").join("Application").join("chrome.exe");
    vec![
        chrome(env_dir(env, "LOCALAPPDATA", "")),
        chrome(env_dir(env, "ProgramFiles", PROGRAM_FILES_FALLBACK)),
        chrome(env_dir(env, "ProgramFiles(x86)", PROGRAM_FILES_X86_FALLBACK)),
    ]
}

/// Edge install location
#[must_use]
pub fn edge_candidate(env: &HashMap<String, String>) -> PathBuf {
    env_dir(env, "ProgramFiles(x86)", PROGRAM_FILES_X86_FALLBACK)
        .join("Microsoft")
        .join("Edge")
        .join("Application")
        .join("msedge.exe")
}

/// Find an installed browser: Chrome first, then Edge
pub fn resolve_browser_executable(
    env: &HashMap<String, String>,
    exists: impl Fn(&Path) -> bool,
) -> Option<ResolvedBrowser> {
    if let Some(executable) = chrome_candidates(env).into_iter().find(|p| exists(p.as_path())) {
        return Some(ResolvedBrowser {
            kind: BrowserKind::Chrome,
            executable,
        });
    }

    let edge = edge_candidate(env);
    exists(edge.as_path()).then_some(ResolvedBrowser {
        kind: BrowserKind::Edge,
        executable: edge,
    })
}

/// Command-line arguments for a chromeless app window
#[must_use]
pub fn launch_args(url: &str, profile_dir: &Path) -> Vec<String> {
    vec![
        "--new-window".to_string(),
        format!("--app={url}"),
        format!("--user-data-dir={}", profile_dir.display()),
        "--disable-session-crashed-bubble".to_string(),
        "--no-first-run".to_string(),
    ]
}

/// Operating-system process operations used by the browser controller
pub trait ProcessLauncher: Send {
    /// Start a detached process and return its pid
    fn spawn(&mut self, program: &Path, args: &[String]) -> Result<u32>;

    /// Terminate a process tree; `Ok(false)` when the kill command failed
    fn terminate(&mut self, pid: u32) -> Result<bool>;

    /// Process is still alive
    fn is_running(&mut self, pid: u32) -> bool;

    /// Hand a URL to the system default handler
    fn open_external(&mut self, url: &str) -> Result<()>;
}

/// [`ProcessLauncher`] backed by `std::process`
#[derive(Debug, Default)]
pub struct SystemLauncher {
    children: HashMap<u32, Child>,
    /// Killed children not yet observed to exit
    terminating: Vec<Child>,
}

impl SystemLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn kill_command(pid: u32) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("taskkill");
            cmd.args(["/PID", &pid.to_string(), "/T", "/F"]);
            cmd
        } else {
            let mut cmd = Command::new("kill");
            cmd.arg(pid.to_string());
            cmd
        }
    }

    fn opener_command(url: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }

    /// Collect exit statuses of killed children
    fn reap_terminated(&mut self) {
        self.terminating.retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl ProcessLauncher for SystemLauncher {
    fn spawn(&mut self, program: &Path, args: &[String]) -> Result<u32> {
        self.reap_terminated();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::Redirect(format!("Failed to launch {}: {e}", program.display())))?;
        let pid = child.id();
        self.children.insert(pid, child);
        Ok(pid)
    }

    fn terminate(&mut self, pid: u32) -> Result<bool> {
        let status = Self::kill_command(pid)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AppError::Redirect(format!("Failed to run kill for pid {pid}: {e}")))?;

        // kill only signals; the exit status is collected on later calls
        if let Some(child) = self.children.remove(&pid) {
            self.terminating.push(child);
        }
        self.reap_terminated();
        Ok(status.success())
    }

    fn is_running(&mut self, pid: u32) -> bool {
        self.reap_terminated();
        let Some(child) = self.children.get_mut(&pid) else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => {
                self.children.remove(&pid);
                false
            }
        }
    }

    fn open_external(&mut self, url: &str) -> Result<()> {
        Self::opener_command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| AppError::Redirect(format!("Failed to open {url} externally: {e}")))
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackedProcess {
    pid: u32,
    browser: BrowserKind,
}

type ExistsProbe = Box<dyn Fn(&Path) -> bool + Send>;

/// Opens the redirect in a Chrome/Edge app window and tracks its process
pub struct BrowserRedirectController<L: ProcessLauncher = SystemLauncher> {
    config: RedirectConfig,
    env: HashMap<String, String>,
    exists: ExistsProbe,
    launcher: L,
    tracked: Option<TrackedProcess>,
}

impl BrowserRedirectController<SystemLauncher> {
    /// Controller using the process environment and the real filesystem
    #[must_use]
    pub fn new(config: RedirectConfig) -> Self {
        Self::with_parts(
            config,
            std::env::vars().collect(),
            Box::new(|path: &Path| path.exists()),
            SystemLauncher::new(),
        )
    }
}

impl<L: ProcessLauncher> BrowserRedirectController<L> {
    /// Controller with injected environment, existence probe and launcher
    pub fn with_parts(config: RedirectConfig, env: HashMap<String, String>, exists: ExistsProbe, launcher: L) -> Self {
        Self {
            config,
            env,
            exists,
            launcher,
            tracked: None,
        }
    }

    /// Browser that the next open would use
    #[must_use]
    pub fn resolve_browser(&self) -> Option<ResolvedBrowser> {
        if let Some(path) = &self.config.browser_path {
            return Some(ResolvedBrowser {
                kind: BrowserKind::Custom,
                executable: path.clone(),
            });
        }
        resolve_browser_executable(&self.env, &self.exists)
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

impl<L: ProcessLauncher> RedirectExecutor for BrowserRedirectController<L> {
    fn open_redirect(&mut self) -> Result<OpenResult> {
        if let Some(tracked) = self.tracked {
            if !self.launcher.is_running(tracked.pid) {
                info!("Redirect window exited (pid={}), launching a new one", tracked.pid);
                self.tracked = None;
            }
        }
        if let Some(tracked) = self.tracked {
            return Ok(OpenResult {
                opened: false,
                pid: Some(tracked.pid),
                browser: tracked.browser.to_string(),
            });
        }

        if self.config.url.trim().is_empty() {
            return Err(AppError::InvalidInput("Redirect URL is empty".to_string()));
        }

        let Some(browser) = self.resolve_browser() else {
            self.launcher.open_external(&self.config.url)?;
            info!("Opened {} with the system handler", self.config.url);
            return Ok(OpenResult {
                opened: true,
                pid: None,
                browser: BrowserKind::External.to_string(),
            });
        };

        let args = launch_args(&self.config.url, &self.config.profile_dir);
        let pid = self.launcher.spawn(&browser.executable, &args)?;
        self.tracked = Some(TrackedProcess {
            pid,
            browser: browser.kind,
        });
        info!("Launched {} redirect window (pid={})", browser.kind, pid);

        Ok(OpenResult {
            opened: true,
            pid: Some(pid),
            browser: browser.kind.to_string(),
        })
    }

    fn close_redirect(&mut self) -> Result<CloseResult> {
        let Some(tracked) = self.tracked.take() else {
            return Ok(CloseResult { closed: false });
        };

        let closed = match self.launcher.terminate(tracked.pid) {
            Ok(closed) => closed,
            Err(e) => {
                warn!("Failed to terminate redirect pid {}: {}", tracked.pid, e);
                false
            }
        };
        Ok(CloseResult { closed })
    }

    fn redirect_state(&mut self) -> RedirectStatus {
        if let Some(tracked) = self.tracked {
            if !self.launcher.is_running(tracked.pid) {
                info!("Redirect window exited (pid={})", tracked.pid);
                self.tracked = None;
            }
        }
        RedirectStatus {
            is_open: self.tracked.is_some(),
            pid: self.tracked.map(|t| t.pid),
        }
    }
}

/// Logical pid reported for a dry-run redirect
pub const DRY_RUN_PID: u32 = 0;

/// Executor that only logs the actions it receives
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    is_open: bool,
    opens: usize,
    closes: usize,
}

impl DryRunExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn opens(&self) -> usize {
        self.opens
    }

    #[must_use]
    pub const fn closes(&self) -> usize {
        self.closes
    }
}

impl RedirectExecutor for DryRunExecutor {
    fn open_redirect(&mut self) -> Result<OpenResult> {
        let opened = !self.is_open;
        if opened {
            self.opens += 1;
            self.is_open = true;
        }
        info!("[dry-run] open redirect (opened={})", opened);
        Ok(OpenResult {
            opened,
            pid: Some(DRY_RUN_PID),
            browser: "dry-run".to_string(),
        })
    }

    fn close_redirect(&mut self) -> Result<CloseResult> {
        let closed = std::mem::take(&mut self.is_open);
        if closed {
            self.closes += 1;
        }
        info!("[dry-run] close redirect (closed={})", closed);
        Ok(CloseResult { closed })
    }

    fn redirect_state(&mut self) -> RedirectStatus {
        RedirectStatus {
            is_open: self.is_open,
            pid: self.is_open.then_some(DRY_RUN_PID),
        }
    }
}

/// Completed action reported back by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Opened(OpenResult),
    Closed(CloseResult),
    OpenFailed(String),
    CloseFailed(String),
}

impl RedirectOutcome {
    /// The state machine believes a redirect is open but none is
    #[must_use]
    pub const fn requires_open_rollback(&self) -> bool {
        match self {
            Self::Opened(result) => result.is_failure(),
            Self::OpenFailed(_) => true,
            Self::Closed(_) | Self::CloseFailed(_) => false,
        }
    }
}

enum WorkerMessage {
    Execute(RedirectAction),
    Status(Sender<RedirectStatus>),
    Shutdown,
}

fn execute(executor: &mut dyn RedirectExecutor, action: RedirectAction) -> RedirectOutcome {
    match action {
        RedirectAction::OpenRedirect { reason } => match executor.open_redirect() {
            Ok(result) => {
                info!(
                    "Open redirect: opened={}, pid={:?}, browser={}, reason={}",
                    result.opened, result.pid, result.browser, reason
                );
                RedirectOutcome::Opened(result)
            }
            Err(e) => {
                error!("Open redirect failed: {}", e);
                RedirectOutcome::OpenFailed(e.to_string())
            }
        },
        RedirectAction::CloseRedirect => match executor.close_redirect() {
            Ok(result) => {
                info!("Close redirect: closed={}", result.closed);
                RedirectOutcome::Closed(result)
            }
            Err(e) => {
                error!("Close redirect failed: {}", e);
                RedirectOutcome::CloseFailed(e.to_string())
            }
        },
    }
}

/// Runs an executor on a worker thread
///
/// At most one open is in flight. An open dispatched while busy is dropped
/// and the state machine re-issues it through normal accumulation. A close
/// is always queued behind the in-flight action, since the machine has
/// already recorded it and would not issue it again.
pub struct RedirectDispatcher {
    commands: Sender<WorkerMessage>,
    outcomes: Receiver<RedirectOutcome>,
    in_flight: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl RedirectDispatcher {
    /// Start the worker thread that owns `executor`
    pub fn spawn(executor: Box<dyn RedirectExecutor>) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<WorkerMessage>();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker_in_flight = Arc::clone(&in_flight);

        let worker = thread::Builder::new()
            .name("redirect-executor".to_string())
            .spawn(move || {
                let mut executor = executor;
                for command in command_rx {
                    match command {
                        WorkerMessage::Execute(action) => {
                            let outcome = execute(executor.as_mut(), action);
                            worker_in_flight.fetch_sub(1, Ordering::SeqCst);
                            if outcome_tx.send(outcome).is_err() {
                                break;
                            }
                        }
                        WorkerMessage::Status(reply) => {
                            let _ = reply.send(executor.redirect_state());
                        }
                        WorkerMessage::Shutdown => break,
                    }
                }

                if executor.redirect_state().is_open {
                    match executor.close_redirect() {
                        Ok(result) => info!("Closed redirect on shutdown (closed={})", result.closed),
                        Err(e) => warn!("Failed to close redirect on shutdown: {}", e),
                    }
                }
            })
            .map_err(|e| AppError::Redirect(format!("Failed to start executor thread: {e}")))?;

        Ok(Self {
            commands: command_tx,
            outcomes: outcome_rx,
            in_flight,
            worker: Some(worker),
        })
    }

    /// Queue an action without waiting; `false` when it was dropped
    pub fn dispatch(&self, action: RedirectAction) -> bool {
        match action {
            RedirectAction::OpenRedirect { .. } => {
                if self
                    .in_flight
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    warn!("Redirect executor busy, dropping {}", action.kind());
                    return false;
                }
            }
            RedirectAction::CloseRedirect => {
                if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    debug!("Redirect executor busy, queueing {}", action.kind());
                }
            }
        }

        if self.commands.send(WorkerMessage::Execute(action)).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            error!("Redirect executor thread is gone, dropping {}", action.kind());
            return false;
        }
        true
    }

    /// An action is in flight or queued
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Drain outcomes that completed since the last call
    pub fn try_recv_outcomes(&self) -> Vec<RedirectOutcome> {
        self.outcomes.try_iter().collect()
    }

    /// Wait up to `timeout` for the next outcome
    pub fn recv_outcome_timeout(&self, timeout: Duration) -> Option<RedirectOutcome> {
        self.outcomes.recv_timeout(timeout).ok()
    }

    /// Query the executor's tracked redirect
    ///
    /// Blocks until the worker has finished any in-flight action.
    pub fn status(&self) -> Result<RedirectStatus> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(WorkerMessage::Status(reply_tx))
            .map_err(|_| AppError::Redirect("Executor thread is gone".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| AppError::Redirect("Executor thread dropped the status request".to_string()))
    }

    /// Stop the worker, closing any tracked redirect
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(WorkerMessage::Shutdown);
            if worker.join().is_err() {
                error!("Redirect executor thread panicked");
            }
        }
    }
}

impl Drop for RedirectDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
