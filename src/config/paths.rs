//! XDG Base Directory locations for store data and configuration.

use crate::error::ApiError;
use std::path::PathBuf;

/// Application directory name under the XDG homes
pub const APP_DIR: &str = "notebook-store";

/// Get XDG data home directory
///
/// Returns `$XDG_DATA_HOME` if set, otherwise defaults to `$HOME/.local/share`
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        if !xdg_data_home.is_empty() {
            return Some(PathBuf::from(xdg_data_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, ApiError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        ApiError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// Default storage root: `$XDG_DATA_HOME/notebook-store/memory`
///
/// Falls back to `.notebook-store/memory` under the working directory when no
/// home directory can be determined.
pub fn default_storage_dir() -> PathBuf {
    match data_home() {
        Some(data_home) => data_home.join(APP_DIR).join("memory"),
        None => PathBuf::from(".notebook-store").join("memory"),
    }
}

/// Default config file: `$XDG_CONFIG_HOME/notebook-store/config.toml`
pub fn default_config_file() -> Result<PathBuf, ApiError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}
