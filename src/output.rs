//! Writing the final session result

use std::path::{Path, PathBuf};

use feedback_core::prelude::*;
use feedback_core::FeedbackResult;

/// Write `result` as pretty JSON to `path`, creating parent directories
pub fn write_result(path: &Path, result: &FeedbackResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(result)?;

    // Write atomically (write to a hidden sibling, then rename)
    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write result to {:?}", temp_path))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to move result into {:?}", path))?;

    debug!("Wrote feedback result to {:?}", path);
    Ok(())
}

/// `dir/.name.tmp` for `dir/name`
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Plain-text rendering printed when no output file was requested
pub fn format_result(result: &FeedbackResult) -> String {
    format!(
        "Logs collected:\n{}\n\nFeedback received:\n{}",
        result.logs, result.user_feedback
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_result_creates_parents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("out").join("result.json");
        let result = FeedbackResult::new("$ ls\nsrc\n", "looks good");

        write_result(&path, &result).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["logs"], "$ ls\nsrc\n");
        assert_eq!(value["user_feedback"], "looks good");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_write_result_overwrites() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("result.json");

        write_result(&path, &FeedbackResult::new("old", "old")).unwrap();
        write_result(&path, &FeedbackResult::new("", "new")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"new\""));
        assert!(!content.contains("\"old\""));
    }

    #[test]
    fn test_write_result_leaves_sibling_tmp_alone() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("result.json");
        let sibling = temp.path().join("result.tmp");
        std::fs::write(&sibling, "keep me").unwrap();

        write_result(&path, &FeedbackResult::new("", "done")).unwrap();

        assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "keep me");
        assert_eq!(temp_path_for(&path), temp.path().join(".result.json.tmp"));
    }

    #[test]
    fn test_format_result() {
        let text = format_result(&FeedbackResult::new("line\n", "ok"));
        assert_eq!(text, "Logs collected:\nline\n\n\nFeedback received:\nok");
    }
}
