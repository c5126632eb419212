//! # feedback-runner - Command Process Management
//!
//! Spawns the command under review through the platform shell, streams its
//! stdout/stderr line by line, and tears down the whole process tree on stop.
//!
//! Depends on [`feedback_core`] for events and error handling.
//!
//! ## Public API
//!
//! ### Process Management
//! - [`CommandProcess`] - Spawn, poll and terminate a shell command
//!
//! ### Process Trees
//! - [`ProcessTable`] - Process enumeration and signalling capability
//! - [`SystemProcessTable`] - `sysinfo`-backed implementation
//! - [`kill_process_tree()`] - Kill a PID and all of its descendants
//!
//! ### Environment
//! - [`user_environment()`] - Environment handed to spawned commands

pub mod environment;
pub mod process;
pub mod process_tree;

pub use environment::user_environment;
pub use process::{CommandProcess, READER_DRAIN_GRACE};
pub use process_tree::{
    descendants, kill_process_tree, kill_tree, KillReport, ProcessTable, SystemProcessTable,
};
