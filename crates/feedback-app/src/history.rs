//! Per-project history of submitted feedback
//!
//! Stored as a JSON array in `<project>/.user-feedback-history.json`. Only the
//! newest [`MAX_SAVED_ENTRIES`] entries are written back.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use feedback_core::prelude::*;

pub const HISTORY_FILENAME: &str = ".user-feedback-history.json";

/// Entries kept on disk
pub const MAX_SAVED_ENTRIES: usize = 20;

const PROMPT_PREVIEW_CHARS: usize = 100;
const LABEL_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryEntry {
    /// When the feedback was submitted (RFC 3339, local time)
    pub timestamp: String,
    pub feedback: String,
    /// Start of the prompt the feedback answered
    #[serde(default)]
    pub prompt: String,
}

impl HistoryEntry {
    pub fn new(feedback: &str, prompt: &str) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            feedback: feedback.to_string(),
            prompt: prompt.chars().take(PROMPT_PREVIEW_CHARS).collect(),
        }
    }

    /// One-line label: `[MM/DD HH:MM] <first 50 chars>...`
    ///
    /// The time prefix is left out when the timestamp can't be parsed.
    pub fn label(&self) -> String {
        let mut preview: String = self.feedback.chars().take(LABEL_PREVIEW_CHARS).collect();
        if self.feedback.chars().count() > LABEL_PREVIEW_CHARS {
            preview.push_str("...");
        }

        match parse_timestamp(&self.timestamp) {
            Some(time) => format!("[{}] {}", time.format("%m/%d %H:%M"), preview),
            None => preview,
        }
    }
}

/// Accepts RFC 3339 and offset-less ISO 8601 timestamps
fn parse_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    if let Ok(time) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(time.naive_local());
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Feedback history bound to one project directory
#[derive(Debug, Clone)]
pub struct FeedbackHistory {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl FeedbackHistory {
    /// Load the project's history; a missing or unreadable file gives an empty history
    pub fn load(project_path: &Path) -> Self {
        let path = project_path.join(HISTORY_FILENAME);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Failed to parse {:?}: {}", path, e);
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file at {:?}", path);
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to read {:?}: {}", path, e);
                Vec::new()
            }
        };

        Self { path, entries }
    }

    /// Record submitted feedback and persist. Blank feedback is not recorded.
    pub fn record(&mut self, feedback: &str, prompt: &str) -> Result<bool> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Ok(false);
        }

        self.entries.push(HistoryEntry::new(feedback, prompt));
        self.save()?;
        Ok(true)
    }

    /// Write the newest entries under an exclusive lock
    pub fn save(&self) -> Result<()> {
        let start = self.entries.len().saturating_sub(MAX_SAVED_ENTRIES);
        let content = serde_json::to_string_pretty(&self.entries[start..])
            .map_err(|e| Error::config(format!("Failed to serialize history: {}", e)))?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| Error::config(format!("Failed to open history file: {}", e)))?;

        // Blocks while another session is writing the same project's history
        file.lock_exclusive()
            .map_err(|e| Error::config(format!("Failed to lock history file: {}", e)))?;

        file.set_len(0)
            .map_err(|e| Error::config(format!("Failed to truncate history file: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| Error::config(format!("Failed to write history file: {}", e)))?;
        file.flush()
            .map_err(|e| Error::config(format!("Failed to flush history file: {}", e)))?;

        debug!("Saved {} history entries to {:?}", self.entries.len() - start, self.path);
        Ok(())
    }

    /// Up to `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter().rev().take(limit)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
