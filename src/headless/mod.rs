//! Console front-end - drives a feedback session from stdin
//!
//! The console is the non-graphical front-end for the session controller.
//! Lines typed on stdin are either `:commands` (see [`commands`]) or feedback
//! text. Captured output is shown on stderr, or, with `--json-events`, every
//! update is written to stdout as NDJSON for scripts and editor integrations.
//!
//! # Event Format
//!
//! Events are output as NDJSON (newline-delimited JSON), one event per line.
//! Each event has an "event" field indicating its type.
//!
//! # Example Output
//!
//! ```json
//! {"event":"session_opened","project":"/work/app","prompt":"Check the build","timestamp":1704700001000}
//! {"event":"log","sequence":1,"level":"other","message":"$ cargo test","timestamp":1704700002000}
//! {"event":"state_changed","state":"idle","exit_code":0,"return_focus":true,"timestamp":1704700003000}
//! ```

pub mod commands;
pub mod runner;

pub use runner::{run_console, ConsoleOptions};

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use feedback_app::{SearchOutcome, StateCause, StateChange};
use feedback_core::{FeedbackResult, LogLine};

/// Events emitted with `--json-events`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Console is ready for input
    SessionOpened {
        project: String,
        prompt: String,
        timestamp: i64,
    },

    /// A line was added to the log store
    Log {
        sequence: u64,
        level: String,
        message: String,
        timestamp: i64,
    },

    /// The session moved between idle, running and closed
    StateChanged {
        state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        return_focus: bool,
        timestamp: i64,
    },

    /// Outcome of `:find`, `:next` or `:prev`
    SearchResult {
        query: String,
        sequence: Option<u64>,
        status: String,
        timestamp: i64,
    },

    /// Informational message for the user
    Notice { message: String, timestamp: i64 },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },

    /// Final result of the session
    Result {
        logs: String,
        user_feedback: String,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // Write to stdout with newline (NDJSON format)
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        // Flush to ensure immediate output
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn session_opened(project: &str, prompt: &str) -> Self {
        Self::SessionOpened {
            project: project.to_string(),
            prompt: prompt.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn log(line: &LogLine) -> Self {
        Self::Log {
            sequence: line.sequence(),
            level: line.level().as_str().to_string(),
            message: line.raw().to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn state_changed(change: &StateChange) -> Self {
        let (command, exit_code) = match &change.cause {
            StateCause::Started { command } => (Some(command.clone()), None),
            StateCause::Exited { code } => (None, *code),
            _ => (None, None),
        };

        Self::StateChanged {
            state: change.state.as_str().to_string(),
            command,
            exit_code,
            return_focus: change.returns_focus(),
            timestamp: Self::now(),
        }
    }

    pub fn search_result(query: &str, outcome: SearchOutcome) -> Self {
        Self::SearchResult {
            query: query.to_string(),
            sequence: outcome.sequence(),
            status: outcome.display_status().to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice {
            message: message.into(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }

    pub fn result(result: &FeedbackResult) -> Self {
        Self::Result {
            logs: result.logs.clone(),
            user_feedback: result.user_feedback.clone(),
            timestamp: Self::now(),
        }
    }
}
