//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    // ─────────────────────────────────────────────────────────────
    // Process/Session Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Please enter a command to run")]
    EmptyCommand,

    #[error("Error running command: {reason}")]
    ProcessSpawn { reason: String },

    #[error("A command is already running; stop it first")]
    AlreadyRunning,

    #[error("The feedback session is already closed")]
    SessionClosed,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid project directory: {path}")]
    InvalidProjectDirectory { path: PathBuf },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_project_directory(path: impl Into<PathBuf>) -> Self {
        Self::InvalidProjectDirectory { path: path.into() }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors leave the session usable: the user can fix the
    /// command and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EmptyCommand
                | Error::ProcessSpawn { .. }
                | Error::AlreadyRunning
                | Error::Config { .. }
                | Error::Io(_)
        )
    }

    /// Check if this error should abort the front-end
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidProjectDirectory { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions (for use with color-eyre)
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
