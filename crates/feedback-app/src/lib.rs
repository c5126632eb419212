//! feedback-app - Session orchestration and persistence for User Feedback
//!
//! Owns the [`LogStore`] and the [`SessionController`] state machine that
//! front-ends drive, plus the collaborator concerns around a session: project
//! config and UI preferences, feedback history, log export, search and OS
//! signal handling.

pub mod config;
pub mod export;
pub mod history;
pub mod log_store;
pub mod search;
pub mod session;
pub mod signals;

// Re-export primary types
pub use config::{ProjectConfig, UiPreferences};
pub use export::export_logs;
pub use history::{FeedbackHistory, HistoryEntry};
pub use log_store::{LogStore, SearchHit};
pub use search::{LogSearch, SearchOutcome};
pub use session::{
    SessionController, SessionOptions, SessionState, StateCause, StateChange, POLL_INTERVAL,
};
pub use signals::ShutdownSignal;
