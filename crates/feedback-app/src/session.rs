//! Session controller: owns the log store and at most one running command
//!
//! The controller is single-threaded. Front-ends call [`SessionController::tick`]
//! every [`POLL_INTERVAL`] while a command runs; each tick moves queued output
//! into the store and detects a natural exit. Observers registered with
//! [`SessionController::on_log_appended`] and
//! [`SessionController::on_state_changed`] are called synchronously from
//! whichever controller method caused the change, in append order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use feedback_core::prelude::*;
use feedback_core::{FeedbackResult, LogLine, ProcessStatus, RunnerEvent};
use feedback_runner::{user_environment, CommandProcess};

use crate::log_store::LogStore;

/// How often a front-end should call [`SessionController::tick`]
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No command running
    #[default]
    Idle,
    Running,
    /// Feedback submitted or dialog closed; terminal
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Closed => "closed",
        }
    }
}

/// Why the session changed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateCause {
    Started { command: String },
    Stopped,
    Exited { code: Option<i32> },
    Submitted,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub state: SessionState,
    pub cause: StateCause,
}

impl StateChange {
    /// The front-end should move focus back to the feedback input
    pub fn returns_focus(&self) -> bool {
        matches!(self.cause, StateCause::Exited { .. })
    }
}

/// Where and how commands run
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub cwd: PathBuf,
    /// Complete environment for spawned commands
    pub env: HashMap<String, String>,
}

impl SessionOptions {
    /// Run in `cwd` with the current user environment
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            env: user_environment(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

type LogObserver = Box<dyn FnMut(&LogLine) + Send>;
type StateObserver = Box<dyn FnMut(&StateChange) + Send>;

struct RunSession {
    command: String,
    process: CommandProcess,
    events: mpsc::UnboundedReceiver<RunnerEvent>,
}

pub struct SessionController {
    options: SessionOptions,
    store: LogStore,
    state: SessionState,
    run: Option<RunSession>,
    /// Sequence of the `$ command` line of the latest run
    run_start: Option<u64>,
    result: Option<FeedbackResult>,
    log_observers: Vec<LogObserver>,
    state_observers: Vec<StateObserver>,
}

impl SessionController {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            store: LogStore::new(),
            state: SessionState::Idle,
            run: None,
            run_start: None,
            result: None,
            log_observers: Vec::new(),
            state_observers: Vec::new(),
        }
    }

    /// Called once for every line added to the store
    pub fn on_log_appended<F>(&mut self, observer: F)
    where
        F: FnMut(&LogLine) + Send + 'static,
    {
        self.log_observers.push(Box::new(observer));
    }

    /// Called after every state transition
    pub fn on_state_changed<F>(&mut self, observer: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.state_observers.push(Box::new(observer));
    }

    /// Start `command` through the platform shell.
    ///
    /// Must be called from within a tokio runtime. A spawn failure is logged
    /// into the store as well as returned; the session stays idle.
    pub fn start(&mut self, command: &str) -> Result<()> {
        match self.state {
            SessionState::Closed => return Err(Error::SessionClosed),
            SessionState::Running => return Err(Error::AlreadyRunning),
            SessionState::Idle => {}
        }

        let command = command.trim();
        if command.is_empty() {
            return Err(Error::EmptyCommand);
        }

        self.append(&format!("$ {command}\n"));
        let run_start = self.store.last_sequence();

        let (event_tx, events) = mpsc::unbounded_channel();
        match CommandProcess::spawn(command, &self.options.cwd, &self.options.env, event_tx) {
            Ok(process) => {
                self.run = Some(RunSession {
                    command: command.to_string(),
                    process,
                    events,
                });
                self.run_start = Some(run_start);
                self.set_state(
                    SessionState::Running,
                    StateCause::Started {
                        command: command.to_string(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start '{}': {}", command, e);
                self.append(&format!("{e}\n"));
                Err(e)
            }
        }
    }

    /// Kill the running command and its descendants.
    ///
    /// Returns `false` when nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(mut run) = self.run.take() else {
            return false;
        };

        info!("Stopping '{}'", run.command);
        run.process.terminate();
        self.drain(&mut run.events);

        self.set_state(SessionState::Idle, StateCause::Stopped);
        true
    }

    /// One-button run control: stop when running, otherwise start
    pub fn toggle(&mut self, command: &str) -> Result<()> {
        if self.is_running() {
            self.stop();
            Ok(())
        } else {
            self.start(command)
        }
    }

    /// Move queued output into the store and detect a natural exit.
    ///
    /// Returns the state change when the command exited during this tick.
    pub fn tick(&mut self) -> Option<StateChange> {
        let mut run = self.run.take()?;

        // Poll first: an exited process has already queued all of its output.
        let status = run.process.poll();
        self.drain(&mut run.events);

        match status {
            ProcessStatus::Running => {
                self.run = Some(run);
                None
            }
            ProcessStatus::Exited(code) => {
                info!("'{}' exited with code {:?}", run.command, code);
                drop(run);
                self.append(&format!("\nProcess exited with code {}\n", exit_code_text(code)));
                Some(self.set_state(SessionState::Idle, StateCause::Exited { code }))
            }
        }
    }

    /// Tick every [`POLL_INTERVAL`] until the running command exits
    pub async fn wait_for_exit(&mut self) -> Option<StateChange> {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        while self.is_running() {
            interval.tick().await;
            if let Some(change) = self.tick() {
                return Some(change);
            }
        }
        None
    }

    /// Finish the session with the user's feedback
    pub fn submit(&mut self, feedback: &str) -> Result<FeedbackResult> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }

        self.stop();
        let result = FeedbackResult::new(self.store.export_text(), feedback.trim());
        self.result = Some(result.clone());
        self.set_state(SessionState::Closed, StateCause::Submitted);
        info!("Feedback submitted ({} log lines)", self.store.len());
        Ok(result)
    }

    /// Close without (further) feedback. Safe to call repeatedly.
    pub fn close(&mut self) -> FeedbackResult {
        self.stop();

        if self.state != SessionState::Closed {
            self.set_state(SessionState::Closed, StateCause::Closed);
        }

        let store = &self.store;
        self.result
            .get_or_insert_with(|| FeedbackResult::new(store.export_text(), ""))
            .clone()
    }

    /// Empty the log store. Never touches a running command.
    pub fn clear_logs(&mut self) {
        if self.state == SessionState::Closed {
            debug!("Ignoring clear on a closed session");
            return;
        }
        self.store.clear();
        self.run_start = None;
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// The command currently running, if any
    pub fn running_command(&self) -> Option<&str> {
        self.run.as_ref().map(|run| run.command.as_str())
    }

    /// Lines produced by the latest run, starting at its `$ command` line
    pub fn current_run_lines(&self) -> &[LogLine] {
        match self.run_start {
            Some(start) => self.store.since(start),
            None => &[],
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.options.cwd
    }

    fn drain(&mut self, events: &mut mpsc::UnboundedReceiver<RunnerEvent>) {
        while let Ok(event) = events.try_recv() {
            self.append(event.chunk());
        }
    }

    fn append(&mut self, chunk: &str) {
        let appended = self.store.append(chunk);
        for line in appended {
            for observer in self.log_observers.iter_mut() {
                observer(line);
            }
        }
    }

    fn set_state(&mut self, state: SessionState, cause: StateCause) -> StateChange {
        debug!("Session {} -> {} ({:?})", self.state.as_str(), state.as_str(), cause);
        self.state = state;

        let change = StateChange { state, cause };
        for observer in self.state_observers.iter_mut() {
            observer(&change);
        }
        change
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(mut run) = self.run.take() {
            warn!("Session dropped while '{}' was running", run.command);
            run.process.terminate();
        }
    }
}

fn exit_code_text(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}
