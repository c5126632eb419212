//! Loading and saving of project config and UI preferences

use std::path::{Path, PathBuf};

use feedback_core::prelude::*;

use super::types::{ProjectConfig, UiPreferences};

/// Project config file, relative to the project directory
pub const PROJECT_CONFIG_FILENAME: &str = ".user-feedback.json";

const APP_DIR: &str = "user-feedback";
const PREFERENCES_FILENAME: &str = "settings.toml";

// ─────────────────────────────────────────────────────────────────────────────
// Project Config
// ─────────────────────────────────────────────────────────────────────────────

/// Load `.user-feedback.json` from the project directory
///
/// Returns defaults if the file doesn't exist or can't be parsed.
pub fn load_project_config(project_path: &Path) -> ProjectConfig {
    let config_path = project_path.join(PROJECT_CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No project config at {:?}, using defaults", config_path);
        return ProjectConfig::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => {
                debug!("Loaded project config from {:?}", config_path);
                config
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                ProjectConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            ProjectConfig::default()
        }
    }
}

/// Save `.user-feedback.json` (pretty-printed, atomic temp file + rename)
pub fn save_project_config(project_path: &Path, config: &ProjectConfig) -> Result<()> {
    let config_path = project_path.join(PROJECT_CONFIG_FILENAME);
    let temp_path = project_path.join(".user-feedback.json.tmp");

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::config(format!("Failed to serialize project config: {}", e)))?;

    std::fs::write(&temp_path, content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;

    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved project config to {:?}", config_path);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// UI Preferences
// ─────────────────────────────────────────────────────────────────────────────

/// Default location of the preferences file: `<config_dir>/user-feedback/settings.toml`
pub fn preferences_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(PREFERENCES_FILENAME)
}

/// Load UI preferences from `path`
///
/// Returns defaults if the file doesn't exist (first run) or can't be parsed.
pub fn load_preferences(path: &Path) -> UiPreferences {
    if !path.exists() {
        debug!("No preferences file at {:?}", path);
        return UiPreferences::default();
    }

    match read_preferences(path) {
        Ok(prefs) => {
            debug!("Loaded UI preferences from {:?}", path);
            prefs
        }
        Err(e) => {
            warn!("Ignoring preferences at {:?}: {}", path, e);
            UiPreferences::default()
        }
    }
}

/// Read and parse the preferences file
fn read_preferences(path: &Path) -> Result<UiPreferences> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Save UI preferences to `path`, creating the parent directory
///
/// Uses atomic write (temp file + rename) for safety.
pub fn save_preferences(path: &Path, prefs: &UiPreferences) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::config(format!("Invalid preferences path: {:?}", path)))?;

    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::config(format!("Failed to create config dir: {}", e)))?;
    }

    let temp_path = dir.join(".settings.toml.tmp");

    let header = "# User Feedback preferences\n\n";
    let content = toml::to_string_pretty(prefs)
        .map_err(|e| Error::config(format!("Failed to serialize preferences: {}", e)))?;

    std::fs::write(&temp_path, format!("{}{}", header, content))
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;

    std::fs::rename(&temp_path, path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    debug!("Saved UI preferences to {:?}", path);
    Ok(())
}
