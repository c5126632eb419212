//! Core domain type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classify::classify;

/// Semantic level of a captured output line
///
/// Derived from the line text by [`classify`]; never assigned by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Success,
    Info,
    /// Line matched none of the level keywords
    Other,
}

impl LogLevel {
    /// Lowercase name used in serialized events
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Success => "success",
            LogLevel::Info => "info",
            LogLevel::Other => "other",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for log levels - controls which lines a view shows
///
/// Lines classified as [`LogLevel::Other`] pass every filter: output that
/// carries no level keyword is never hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevelFilter {
    /// Show all lines
    #[default]
    All,
    Error,
    Warning,
    Success,
    Info,
}

impl LogLevelFilter {
    /// Cycle to the next filter option (wraps around)
    pub fn cycle(self) -> Self {
        match self {
            LogLevelFilter::All => LogLevelFilter::Error,
            LogLevelFilter::Error => LogLevelFilter::Warning,
            LogLevelFilter::Warning => LogLevelFilter::Success,
            LogLevelFilter::Success => LogLevelFilter::Info,
            LogLevelFilter::Info => LogLevelFilter::All,
        }
    }

    /// Check if a log level passes this filter
    pub fn matches(&self, level: LogLevel) -> bool {
        if level == LogLevel::Other {
            return true;
        }
        match self {
            LogLevelFilter::All => true,
            LogLevelFilter::Error => level == LogLevel::Error,
            LogLevelFilter::Warning => level == LogLevel::Warning,
            LogLevelFilter::Success => level == LogLevel::Success,
            LogLevelFilter::Info => level == LogLevel::Info,
        }
    }

    /// Get a user-friendly display name for the filter
    pub fn display_name(&self) -> &'static str {
        match self {
            LogLevelFilter::All => "All",
            LogLevelFilter::Error => "Error",
            LogLevelFilter::Warning => "Warning",
            LogLevelFilter::Success => "Success",
            LogLevelFilter::Info => "Info",
        }
    }
}

impl FromStr for LogLevelFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(LogLevelFilter::All),
            "error" | "errors" => Ok(LogLevelFilter::Error),
            "warning" | "warn" => Ok(LogLevelFilter::Warning),
            "success" => Ok(LogLevelFilter::Success),
            "info" => Ok(LogLevelFilter::Info),
            other => Err(format!("unknown log filter: {other}")),
        }
    }
}

/// Terminator that ended a line in the child's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTerminator {
    #[default]
    Lf,
    CrLf,
}

impl LineTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
        }
    }
}

/// A single classified line of captured output
///
/// Immutable once created; the level is computed from the text at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    raw: String,
    level: LogLevel,
    sequence: u64,
    terminator: LineTerminator,
}

impl LogLine {
    /// Create a line, classifying its text
    pub fn new(sequence: u64, raw: impl Into<String>, terminator: LineTerminator) -> Self {
        let raw = raw.into();
        Self {
            level: classify(&raw),
            raw,
            sequence,
            terminator,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// 1-based position of this line in its store
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn terminator(&self) -> LineTerminator {
        self.terminator
    }

    /// Format for single-line plain display
    pub fn display_line(&self, show_line_numbers: bool) -> String {
        if show_line_numbers {
            format!("{:4} | {}", self.sequence, self.raw)
        } else {
            self.raw.clone()
        }
    }
}

/// Direction of a log search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

/// Final outcome of a feedback session
///
/// Serialized as `{"logs": ..., "user_feedback": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// Every captured line joined with its original terminator
    pub logs: String,
    pub user_feedback: String,
}

impl FeedbackResult {
    pub fn new(logs: impl Into<String>, user_feedback: impl Into<String>) -> Self {
        Self {
            logs: logs.into(),
            user_feedback: user_feedback.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_is_classified_on_creation() {
        let line = LogLine::new(1, "build FAILED", LineTerminator::Lf);
        assert_eq!(line.level(), LogLevel::Error);
        assert_eq!(line.sequence(), 1);
        assert_eq!(line.raw(), "build FAILED");
    }

    #[test]
    fn test_display_line_with_numbers() {
        let line = LogLine::new(7, "hello", LineTerminator::Lf);
        assert_eq!(line.display_line(true), "   7 | hello");
        assert_eq!(line.display_line(false), "hello");
    }

    #[test]
    fn test_level_filter_other_always_passes() {
        for filter in [
            LogLevelFilter::All,
            LogLevelFilter::Error,
            LogLevelFilter::Warning,
            LogLevelFilter::Success,
            LogLevelFilter::Info,
        ] {
            assert!(filter.matches(LogLevel::Other), "{filter:?} hid Other");
        }
    }

    #[test]
    fn test_level_filter_matches_only_its_level() {
        assert!(LogLevelFilter::Error.matches(LogLevel::Error));
        assert!(!LogLevelFilter::Error.matches(LogLevel::Warning));
        assert!(!LogLevelFilter::Warning.matches(LogLevel::Error));
        assert!(LogLevelFilter::All.matches(LogLevel::Info));
    }

    #[test]
    fn test_level_filter_cycle_wraps() {
        let mut filter = LogLevelFilter::All;
        for _ in 0..5 {
            filter = filter.cycle();
        }
        assert_eq!(filter, LogLevelFilter::All);
    }

    #[test]
    fn test_level_filter_from_str() {
        assert_eq!("Error".parse::<LogLevelFilter>(), Ok(LogLevelFilter::Error));
        assert_eq!(" warn ".parse::<LogLevelFilter>(), Ok(LogLevelFilter::Warning));
        assert!("verbose".parse::<LogLevelFilter>().is_err());
    }

    #[test]
    fn test_feedback_result_json_shape() {
        let result = FeedbackResult::new("$ ls\n", "looks good");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"logs": "$ ls\n", "user_feedback": "looks good"})
        );
    }

    #[test]
    fn test_terminator_strings() {
        assert_eq!(LineTerminator::default().as_str(), "\n");
        assert_eq!(LineTerminator::CrLf.as_str(), "\r\n");
    }
}
