//! Domain event definitions

use serde::Serialize;

/// Which pipe of the child process produced a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Events forwarded from the process reader tasks to the session
///
/// Each chunk is one line of output including its terminator when the child
/// wrote one. Invalid UTF-8 has already been replaced with U+FFFD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Stdout(String),
    Stderr(String),
}

impl RunnerEvent {
    pub fn stream(&self) -> OutputStream {
        match self {
            RunnerEvent::Stdout(_) => OutputStream::Stdout,
            RunnerEvent::Stderr(_) => OutputStream::Stderr,
        }
    }

    /// The raw chunk carried by this event
    pub fn chunk(&self) -> &str {
        match self {
            RunnerEvent::Stdout(chunk) | RunnerEvent::Stderr(chunk) => chunk,
        }
    }

    pub fn into_chunk(self) -> String {
        match self {
            RunnerEvent::Stdout(chunk) | RunnerEvent::Stderr(chunk) => chunk,
        }
    }
}

/// Liveness of a spawned command, as reported by a non-blocking poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// Exit code, or `None` when the process was ended by a signal
    Exited(Option<i32>),
}

impl ProcessStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }
}
