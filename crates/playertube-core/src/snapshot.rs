//! Persisted library state.
//!
//! The snapshot holds the channel collection (including playback progress)
//! and the active selection. Directory capabilities are not part of it;
//! they live in the [`HandleStore`](crate::handle_store::HandleStore).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::Channel;
use crate::error::{Error, Result};
use crate::selection::Selection;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to restore the library after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LibrarySnapshot {
    /// Format version the snapshot was written with.
    pub version: u32,
    /// Channel collection.
    pub channels: Vec<Channel>,
    /// Active selection.
    pub selection: Selection,
}

impl Default for LibrarySnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            channels: Vec::new(),
            selection: Selection::default(),
        }
    }
}

impl LibrarySnapshot {
    /// Create a snapshot of the given state.
    #[must_use]
    pub const fn new(channels: Vec<Channel>, selection: Selection) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            channels,
            selection,
        }
    }

    /// Load a snapshot, or an empty one if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Snapshot {} not found, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Snapshot(format!("Failed to read {}: {e}", path.display())))?;
        let mut snapshot: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Snapshot(format!("Failed to parse {}: {e}", path.display())))?;
        snapshot.channels.iter_mut().for_each(Channel::refresh_totals);

        info!(
            "Loaded {} channel(s) from {} (version {})",
            snapshot.channels.len(),
            path.display(),
            snapshot.version
        );
        Ok(snapshot)
    }

    /// Write the snapshot, replacing any previous file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Snapshot(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let temp = temp_path(path);
        fs::write(&temp, content)
            .map_err(|e| Error::Snapshot(format!("Failed to write {}: {e}", temp.display())))?;
        fs::rename(&temp, path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            Error::Snapshot(format!("Failed to replace {}: {e}", path.display()))
        })?;

        debug!("Saved snapshot to {}", path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::{PlaybackState, Playlist, Video};
    use crate::progress::record_progress;
    use tempfile::TempDir;

    fn sample() -> LibrarySnapshot {
        let mut video = Video::new("A/1.mp4", "1.mp4", 2048);
        video.playback = PlaybackState::InProgress {
            current_time: 12.5,
            duration: 100.0,
        };
        LibrarySnapshot::new(
            vec![Channel::new(
                "c1",
                "Videos",
                vec![Playlist::from_videos("A", "A", vec![video])],
            )],
            Selection::channel("c1").with_playlist("A"),
        )
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let snapshot = LibrarySnapshot::load(&temp.path().join("library.json")).unwrap();
        assert!(snapshot.channels.is_empty());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data").join("library.json");

        sample().save(&path).unwrap();
        assert!(!temp_path(&path).exists());

        let loaded = LibrarySnapshot::load(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_missing_fields_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("library.json");
        fs::write(
            &path,
            r#"{"channels":[{"id":"c1","playlists":[{"id":"A","videos":[{"id":"A/1.mp4"},{"id":"A/2.mp4"}]}]}],"extra":true}"#,
        )
        .unwrap();

        let loaded = LibrarySnapshot::load(&path).unwrap();
        let video = loaded.channels[0].find_video("A/1.mp4").unwrap();
        assert_eq!(video.playback, PlaybackState::NotStarted);
        assert!(loaded.selection.is_empty());
        assert_eq!(loaded.channels[0].playlists[0].video_count, 2);
        assert_eq!(loaded.channels[0].video_count(), 2);
    }

    #[test]
    fn test_non_finite_progress_survives_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("library.json");

        let mut snapshot = sample();
        snapshot.channels = record_progress(&snapshot.channels, "A/1.mp4", 0.0, f64::NAN);
        snapshot.save(&path).unwrap();
        assert_eq!(LibrarySnapshot::load(&path).unwrap(), sample());

        // Files written with a NaN duration still contain `null`.
        let content = fs::read_to_string(&path)
            .unwrap()
            .replace("\"duration\": 100.0", "\"duration\": null");
        fs::write(&path, content).unwrap();
        let loaded = LibrarySnapshot::load(&path).unwrap();
        let video = loaded.channels[0].find_video("A/1.mp4").unwrap();
        assert_eq!(video.current_time(), Some(12.5));
        assert_eq!(video.duration(), Some(0.0));
    }

    #[test]
    fn test_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("library.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            LibrarySnapshot::load(&path),
            Err(Error::Snapshot(_))
        ));
    }
}
