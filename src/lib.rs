//! User Feedback Library
//!
//! Console front-end for the feedback dialog: runs a command, shows its
//! captured output and collects the user's feedback.

// Module declarations
pub mod headless;
pub mod output;

// Re-export main entry points
pub use headless::{run_console, ConsoleOptions};
pub use output::{format_result, write_result};
