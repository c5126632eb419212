//! Writing captured logs to a timestamped text file

use std::path::{Path, PathBuf};

use chrono::Local;

use feedback_core::prelude::*;

use crate::log_store::LogStore;

/// File name for an export made now: `feedback-logs-YYYYmmdd-HHMMSS.txt`
pub fn export_file_name() -> String {
    format!("feedback-logs-{}.txt", Local::now().format("%Y%m%d-%H%M%S"))
}

/// Write the store's text into `dir` and return the new file's path
pub fn export_logs(store: &LogStore, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(export_file_name());
    std::fs::write(&path, store.export_text())
        .with_context(|| format!("Failed to export logs to {:?}", path))?;
    info!("Exported {} log lines to {:?}", store.len(), path);
    Ok(path)
}
