//! Configuration file handling for User Feedback
//!
//! Supports:
//! - `<project>/.user-feedback.json` - Run command, auto-execute, templates
//! - `<config_dir>/user-feedback/settings.toml` - UI preferences

pub mod settings;
pub mod types;

pub use settings::{
    load_preferences, load_project_config, preferences_path, save_preferences,
    save_project_config, PROJECT_CONFIG_FILENAME,
};
pub use types::*;
