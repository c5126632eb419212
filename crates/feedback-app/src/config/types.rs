//! Configuration types for User Feedback
//!
//! Defines:
//! - `ProjectConfig` - Per-project run command and templates (`.user-feedback.json`)
//! - `UiPreferences` - Per-user view preferences (`settings.toml`)

use serde::{Deserialize, Serialize};

use feedback_core::LogLevelFilter;

/// Per-project settings stored next to the code under review
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Command pre-filled in the run box
    #[serde(default)]
    pub run_command: String,

    /// Start `run_command` as soon as the session opens
    #[serde(default)]
    pub execute_automatically: bool,

    /// Saved commands, in the order they were added
    #[serde(default)]
    pub command_templates: Vec<String>,

    /// Saved feedback snippets
    #[serde(default)]
    pub feedback_templates: Vec<String>,
}

impl ProjectConfig {
    /// Remember a command. Blank and duplicate commands are ignored.
    ///
    /// Returns `true` when the list changed.
    pub fn add_command_template(&mut self, command: &str) -> bool {
        add_unique(&mut self.command_templates, command)
    }

    /// Remember a feedback snippet. Blank and duplicate snippets are ignored.
    pub fn add_feedback_template(&mut self, feedback: &str) -> bool {
        add_unique(&mut self.feedback_templates, feedback)
    }

    pub fn remove_feedback_template(&mut self, feedback: &str) -> bool {
        let before = self.feedback_templates.len();
        self.feedback_templates.retain(|t| t != feedback);
        self.feedback_templates.len() != before
    }

    /// The command to start automatically, if auto-execute is on and one is set
    pub fn auto_start_command(&self) -> Option<&str> {
        let command = self.run_command.trim();
        (self.execute_automatically && !command.is_empty()).then_some(command)
    }
}

fn add_unique(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|t| t == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

/// View preferences shared by every project
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub show_line_numbers: bool,

    #[serde(default)]
    pub log_filter: LogLevelFilter,
}
