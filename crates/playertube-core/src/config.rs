//! Application configuration management.
//!
//! Handles loading and saving settings: where the library snapshot and the
//! directory handles are stored, and how playback and scanning behave.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::progress::WATCHED_THRESHOLD;
use crate::scanner::ScanOptions;

const APP_DIR: &str = "playertube";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Path of the library snapshot.
    #[serde(default = "default_library_file")]
    pub library_file: PathBuf,
    /// Path of the directory handle store.
    #[serde(default = "default_handles_file")]
    pub handles_file: PathBuf,
    /// Fraction of a video that must be played to mark it watched.
    #[serde(default = "default_watched_threshold")]
    pub watched_threshold: f64,
    /// Ignore subdirectories whose names start with `.`.
    #[serde(default = "default_true")]
    pub skip_hidden_directories: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_watched_threshold() -> f64 {
    WATCHED_THRESHOLD
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_file: default_library_file(),
            handles_file: default_handles_file(),
            watched_threshold: WATCHED_THRESHOLD,
            skip_hidden_directories: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or use defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        debug!("Library file: {}", config.library_file.display());
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Configuration(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            Error::Configuration(format!("Failed to write {}: {e}", path.display()))
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Update the watched threshold.
    ///
    /// # Errors
    ///
    /// Returns an error unless `threshold` is in `(0, 1)`.
    pub fn set_watched_threshold(&mut self, threshold: f64) -> Result<()> {
        validate_threshold(threshold)?;
        self.watched_threshold = threshold;
        info!("Updated watched threshold to {}", threshold);
        Ok(())
    }

    /// Scanner options derived from this configuration.
    #[must_use]
    pub const fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_hidden_directories: self.skip_hidden_directories,
        }
    }

    /// Get the path to the default config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }

    fn validate(&self) -> Result<()> {
        validate_threshold(self.watched_threshold)
    }
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold > 0.0 && threshold < 1.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "Watched threshold must be in (0, 1), got {threshold}"
        )))
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of the library snapshot.
#[must_use]
pub fn default_library_file() -> PathBuf {
    data_dir().join("library.json")
}

/// Default location of the handle store.
#[must_use]
pub fn default_handles_file() -> PathBuf {
    data_dir().join("handles.json")
}

fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(APP_DIR)
        .join("config.json")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.library_file.ends_with("library.json"));
        assert!(config.handles_file.ends_with("handles.json"));
        assert!((config.watched_threshold - 0.98).abs() < f64::EPSILON);
        assert!(config.skip_hidden_directories);
    }

    #[test]
    fn test_load_missing_writes_defaults() {
        let temp = TempDir::new().expect("Should create temp dir");
        let path = temp.path().join("conf").join("config.json");

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().expect("Should create temp dir");
        let path = temp.path().join("config.json");
        let config = AppConfig {
            library_file: PathBuf::from("/data/library.json"),
            skip_hidden_directories: false,
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().expect("Should create temp dir");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"watched_threshold": 0.9}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert!((config.watched_threshold - 0.9).abs() < f64::EPSILON);
        assert!(config.skip_hidden_directories);
        assert_eq!(config.handles_file, default_handles_file());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        assert!(config.set_watched_threshold(0.0).is_err());
        assert!(config.set_watched_threshold(1.5).is_err());
        assert!(config.set_watched_threshold(f64::NAN).is_err());
        // Watched needs a ratio strictly above the threshold, so 1.0 is unreachable.
        assert!(config.set_watched_threshold(1.0).is_err());
        config.set_watched_threshold(0.9).unwrap();
        assert!((config.watched_threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_threshold_in_file() {
        let temp = TempDir::new().expect("Should create temp dir");
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"watched_threshold": 2.0}"#).unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_corrupt_file() {
        let temp = TempDir::new().expect("Should create temp dir");
        let path = temp.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_scan_options_follow_config() {
        let config = AppConfig {
            skip_hidden_directories: false,
            ..Default::default()
        };
        assert!(!config.scan_options().skip_hidden_directories);
    }
}
