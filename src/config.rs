//! Where the library lives and how the CLI treats it, read from a TOML file
//! in the platform config directory:
//! - Windows: %APPDATA%\songkeeper\config.toml
//! - macOS: ~/Library/Application Support/songkeeper/config.toml
//! - Linux: ~/.config/songkeeper/config.toml
//!
//! The file is human-readable and editable. The group-by-album flag is not
//! here: it is library state and lives in the catalog.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "songkeeper";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library settings
    pub library: LibraryConfig,
}

/// Library management settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Managed root directory
    pub root: PathBuf,

    /// SQLite catalog file
    pub database: PathBuf,

    /// Whether `watch` reacts to out-of-band changes
    pub watch_for_changes: bool,

    /// Run a synchronization pass whenever the library is opened
    pub sync_on_start: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: dirs::audio_dir()
                .map(|d| d.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(APP_DIR)),
            database: dirs::data_dir()
                .map(|d| d.join(APP_DIR).join("catalog.db"))
                .unwrap_or_else(|| PathBuf::from("catalog.db")),
            watch_for_changes: true,
            sync_on_start: true,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load `config.toml` from the platform config directory.
///
/// Never fails: a missing or unreadable file yields the defaults.
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!(target: "config", "Could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!(target: "config", path = %path.display(), "No config file found, using defaults");
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str::<Config>(&text) {
            Ok(loaded) => {
                tracing::info!(target: "config", path = %path.display(), "Loaded config");
                loaded
            }
            Err(e) => {
                tracing::warn!(target: "config", path = %path.display(), error = %e, "Ignoring unparsable config file");
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(target: "config", path = %path.display(), error = %e, "Ignoring unreadable config file");
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to a specific file.
///
/// Creates the parent directory if needed and writes atomically
/// (temp file, then rename).
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let text = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    let staging = path.with_extension("toml.tmp");
    std::fs::write(&staging, &text).map_err(|e| ConfigError::Write(staging.clone(), e))?;
    std::fs::rename(&staging, path).map_err(|e| ConfigError::Rename(staging, path.to_path_buf(), e))?;

    tracing::info!(target: "config", path = %path.display(), "Saved config");
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Failures while writing the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No platform config directory is available")]
    NoConfigDir,

    #[error("Cannot create {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Cannot encode config as TOML: {0}")]
    Serialize(toml::ser::Error),

    #[error("Cannot write {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Cannot move {0} into place at {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        crate::error::Error::config(e.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
