//! Frame-replay application loop.
//!
//! Reads JSON-lines landmark frames, drives a [`FocusSession`] once per
//! frame and hands the resulting actions to a [`RedirectDispatcher`].

use crate::{
    config::Config,
    error::Result,
    landmarks::LandmarkFrame,
    redirect::{BrowserRedirectController, DryRunExecutor, RedirectDispatcher, RedirectExecutor, RedirectOutcome},
    session::FocusSession,
    state_machine::{Phase, RedirectAction},
};
use log::{info, warn};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

/// How long to wait for an in-flight action when the stream ends
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// JSON-lines file
    File(PathBuf),
    /// Standard input
    Stdin,
}

/// Which executor carries out redirect actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorMode {
    /// Launch a real browser window
    Browser,
    /// Only log actions
    DryRun,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Frame stream
    pub frame_source: FrameSource,
    /// Redirect executor
    pub executor_mode: ExecutorMode,
    /// Sleep between frames according to their timestamps
    pub realtime: bool,
    /// Session and redirect settings
    pub settings: Config,
}

/// Counters reported when the stream ends
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: usize,
    pub skipped_lines: usize,
    pub opens: usize,
    pub closes: usize,
    pub dropped_actions: usize,
    pub failed_opens: usize,
    pub final_phase: Phase,
    pub redirect_open: bool,
}

/// Main application struct
pub struct FocusGuardApp {
    config: AppConfig,
    session: FocusSession,
    dispatcher: RedirectDispatcher,
    summary: RunSummary,
    /// Dispatched actions whose outcome has not been applied yet
    pending_outcomes: usize,
}

impl FocusGuardApp {
    /// Create the session and start the executor thread
    pub fn new(config: AppConfig) -> Result<Self> {
        let executor: Box<dyn RedirectExecutor> = match config.executor_mode {
            ExecutorMode::Browser => {
                info!("Redirect target: {}", config.settings.redirect.url);
                Box::new(BrowserRedirectController::new(config.settings.redirect.clone()))
            }
            ExecutorMode::DryRun => {
                info!("Dry run: redirect actions are only logged");
                Box::new(DryRunExecutor::new())
            }
        };
        Self::with_executor(config, executor)
    }

    /// Create the app around an existing executor
    pub fn with_executor(config: AppConfig, executor: Box<dyn RedirectExecutor>) -> Result<Self> {
        config.settings.validate()?;
        if config.settings.session.adaptive_thresholds {
            info!("Adaptive thresholds enabled");
        }

        let mut session = FocusSession::new(&config.settings);
        let dispatcher = RedirectDispatcher::spawn(executor)?;
        match dispatcher.status() {
            Ok(status) => session.sync_initial_redirect(status),
            Err(e) => warn!("Failed to read initial redirect state: {}", e),
        }

        Ok(Self {
            config,
            session,
            dispatcher,
            summary: RunSummary {
                frames: 0,
                skipped_lines: 0,
                opens: 0,
                closes: 0,
                dropped_actions: 0,
                failed_opens: 0,
                final_phase: Phase::Calibrating,
                redirect_open: false,
            },
            pending_outcomes: 0,
        })
    }

    /// Process the configured frame source until it ends
    pub fn run(&mut self) -> Result<RunSummary> {
        match self.config.frame_source.clone() {
            FrameSource::File(path) => {
                info!("Reading frames from {}", path.display());
                let file = File::open(&path)?;
                self.run_from_reader(BufReader::new(file))
            }
            FrameSource::Stdin => {
                info!("Reading frames from stdin");
                let stdin = io::stdin();
                self.run_from_reader(stdin.lock())
            }
        }
    }

    /// Process every frame of a JSON-lines reader
    pub fn run_from_reader<R: BufRead>(&mut self, reader: R) -> Result<RunSummary> {
        info!("Starting main application loop");
        let start_time = Instant::now();
        let mut first_frame_at: Option<f64> = None;

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let frame = match LandmarkFrame::from_json(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping line {}: {}", line_number + 1, e);
                    self.summary.skipped_lines += 1;
                    continue;
                }
            };

            if first_frame_at.is_none() {
                first_frame_at = Some(frame.t_ms);
                self.session.start(frame.t_ms);
            }
            if self.config.realtime {
                if let Some(first) = first_frame_at {
                    Self::pace(start_time, frame.t_ms - first);
                }
            }

            self.drain_outcomes();
            let outcome = self.session.tick(&frame);
            self.summary.frames += 1;
            if let Some(action) = outcome.action {
                self.dispatch(action);
            }
        }

        self.finish();
        Ok(self.summary.clone())
    }

    fn pace(start_time: Instant, offset_ms: f64) {
        if !offset_ms.is_finite() || offset_ms <= 0.0 {
            return;
        }
        let target = Duration::from_secs_f64(offset_ms / 1000.0);
        if let Some(wait) = target.checked_sub(start_time.elapsed()) {
            thread::sleep(wait);
        }
    }

    fn dispatch(&mut self, action: RedirectAction) {
        if !self.dispatcher.dispatch(action) {
            self.summary.dropped_actions += 1;
            return;
        }
        self.pending_outcomes += 1;
        match action {
            RedirectAction::OpenRedirect { .. } => self.summary.opens += 1,
            RedirectAction::CloseRedirect => self.summary.closes += 1,
        }
    }

    fn apply_outcome(&mut self, outcome: &RedirectOutcome) {
        self.pending_outcomes = self.pending_outcomes.saturating_sub(1);
        if outcome.requires_open_rollback() {
            self.summary.failed_opens += 1;
        }
        self.session.apply_outcome(outcome);
    }

    fn drain_outcomes(&mut self) {
        for outcome in self.dispatcher.try_recv_outcomes() {
            self.apply_outcome(&outcome);
        }
    }

    fn finish(&mut self) {
        while self.pending_outcomes > 0 {
            let Some(outcome) = self.dispatcher.recv_outcome_timeout(DRAIN_TIMEOUT) else {
                warn!("Redirect executor did not finish within {:?}", DRAIN_TIMEOUT);
                break;
            };
            self.apply_outcome(&outcome);
        }
        self.drain_outcomes();

        let state = self.session.state();
        self.summary.final_phase = state.phase;
        self.summary.redirect_open = state.redirect_open;
        info!(
            "Replay finished: frames={}, skipped={}, opens={}, closes={}, dropped={}, failed_opens={}, phase={}",
            self.summary.frames,
            self.summary.skipped_lines,
            self.summary.opens,
            self.summary.closes,
            self.summary.dropped_actions,
            self.summary.failed_opens,
            self.summary.final_phase
        );
    }

    /// Session driven by this app
    #[must_use]
    pub const fn session(&self) -> &FocusSession {
        &self.session
    }

    /// Stop the executor thread, closing any open redirect
    pub fn shutdown(&mut self) {
        info!("Application shutting down");
        self.dispatcher.shutdown();
    }
}
