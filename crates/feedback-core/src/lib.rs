//! # feedback-core - Core Domain Types
//!
//! Foundation crate for User Feedback. Provides domain types, error handling,
//! line classification and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, toml, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`LogLine`] - A captured output line with level and sequence number
//! - [`LogLevel`] - Line level (Error, Warning, Success, Info, Other)
//! - [`LogLevelFilter`] - Level filter used by log views
//! - [`FeedbackResult`] - Final `{logs, user_feedback}` outcome
//!
//! ### Classification (`classify`)
//! - [`classify()`] - Map a raw line to its [`LogLevel`]
//! - [`highlight()`] - Render a raw line as HTML with colour spans
//!
//! ### Events (`events`)
//! - [`RunnerEvent`] - Output chunk forwarded from a reader task
//! - [`ProcessStatus`] - Result of a non-blocking liveness poll
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use feedback_core::prelude::*;
//! ```

pub mod classify;
pub mod error;
pub mod events;
pub mod logging;
pub mod prelude;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use classify::{classify, escape_html, highlight, highlight_as};
pub use error::{Error, Result, ResultExt};
pub use events::{OutputStream, ProcessStatus, RunnerEvent};
pub use types::{
    FeedbackResult, LineTerminator, LogLevel, LogLevelFilter, LogLine, SearchDirection,
};
