//! Catalog data model and assembly.
//!
//! A [`Channel`] is one imported root directory. Its [`Playlist`]s are the
//! immediate subdirectories that contain videos, plus a synthetic
//! "Main Folder" playlist for videos sitting directly in the root.
//!
//! [`assemble`] turns the unordered output of the scanner into the sorted,
//! indexed catalog. Playback state is never produced here; it belongs to
//! the merge step and to [`crate::progress`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::order::{natural_cmp, sort_natural_by};
use crate::scanner::{ScannedDirectory, ScannedFile};
use crate::title::clean_title;

/// Id of the synthetic playlist holding root-level videos.
///
/// Names starting with `.` are never scanned as playlists, so this id
/// cannot collide with a real subdirectory.
pub const ROOT_PLAYLIST_ID: &str = ".";

/// Display name of the synthetic root playlist.
pub const ROOT_PLAYLIST_NAME: &str = "Main Folder";

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary units and one decimal place.
///
/// Trailing `.0` is dropped, so 1024 bytes is `"1 KB"` and 1536 bytes is
/// `"1.5 KB"`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{value:.1}");
    let formatted = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{formatted} {}", SIZE_UNITS[unit])
}

/// Reads a stored position, treating `null` (how JSON writes NaN and
/// infinity) as zero.
fn seconds_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let seconds = Option::<f64>::deserialize(deserializer)?;
    Ok(seconds.filter(|s| s.is_finite()).unwrap_or(0.0))
}

/// Playback progress of a single video.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlaybackState {
    /// Never played.
    #[default]
    NotStarted,
    /// Played partway.
    InProgress {
        /// Last reported position in seconds.
        #[serde(default, deserialize_with = "seconds_or_zero")]
        current_time: f64,
        /// Total length in seconds.
        #[serde(default, deserialize_with = "seconds_or_zero")]
        duration: f64,
    },
    /// Played to the end at least once. Stays watched on re-watch.
    Watched {
        /// Last reported position in seconds.
        #[serde(default, deserialize_with = "seconds_or_zero")]
        current_time: f64,
        /// Total length in seconds.
        #[serde(default, deserialize_with = "seconds_or_zero")]
        duration: f64,
    },
}

impl PlaybackState {
    /// Last reported position, if the video was ever played.
    #[must_use]
    pub const fn current_time(&self) -> Option<f64> {
        match self {
            Self::NotStarted => None,
            Self::InProgress { current_time, .. } | Self::Watched { current_time, .. } => {
                Some(*current_time)
            }
        }
    }

    /// Last reported duration, if the video was ever played.
    #[must_use]
    pub const fn duration(&self) -> Option<f64> {
        match self {
            Self::NotStarted => None,
            Self::InProgress { duration, .. } | Self::Watched { duration, .. } => Some(*duration),
        }
    }

    /// Whether the video has been watched to the end.
    #[must_use]
    pub const fn is_watched(&self) -> bool {
        matches!(self, Self::Watched { .. })
    }

    /// Position playback should resume from.
    #[must_use]
    pub fn resume_position(&self) -> f64 {
        self.current_time().unwrap_or(0.0)
    }

    /// Fraction of the video played, in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match (self.current_time(), self.duration()) {
            (Some(t), Some(d)) if d > 0.0 && d.is_finite() => (t / d).clamp(0.0, 1.0),
            _ if self.is_watched() => 1.0,
            _ => 0.0,
        }
    }
}

/// A single playable file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Video {
    /// Stable identity: the path relative to the channel root.
    pub id: String,
    /// Normalized display title.
    pub title: String,
    /// Raw filename, used for ordering.
    pub original_name: String,
    /// Path relative to the channel root, `/`-separated.
    pub path: String,
    /// Zero-based position within its playlist.
    pub index: usize,
    /// Human-readable size.
    pub size: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Playback progress, carried over across rescans.
    pub playback: PlaybackState,
}

impl Video {
    /// Create a fresh, never-played video from a relative path.
    pub fn new(path: impl Into<String>, original_name: impl Into<String>, size_bytes: u64) -> Self {
        let path = path.into();
        let original_name = original_name.into();
        Self {
            id: path.clone(),
            title: clean_title(&original_name),
            original_name,
            path,
            index: 0,
            size: format_size(size_bytes),
            size_bytes,
            playback: PlaybackState::NotStarted,
        }
    }

    /// Last reported position.
    #[must_use]
    pub const fn current_time(&self) -> Option<f64> {
        self.playback.current_time()
    }

    /// Last reported duration.
    #[must_use]
    pub const fn duration(&self) -> Option<f64> {
        self.playback.duration()
    }

    /// Whether the video has been watched.
    #[must_use]
    pub const fn is_watched(&self) -> bool {
        self.playback.is_watched()
    }
}

/// A group of videos from one subdirectory, or from the channel root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Playlist {
    /// Directory name, or [`ROOT_PLAYLIST_ID`].
    pub id: String,
    /// Display name.
    pub name: String,
    /// Always equal to `videos.len()`.
    pub video_count: usize,
    /// Videos in natural filename order.
    pub videos: Vec<Video>,
    /// Human-readable total size.
    pub total_size: String,
    /// Total size in bytes.
    pub total_bytes: u64,
}

impl Playlist {
    /// Build a playlist from unordered videos.
    ///
    /// Videos are sorted by original filename and re-indexed from zero.
    pub fn from_videos(id: impl Into<String>, name: impl Into<String>, mut videos: Vec<Video>) -> Self {
        sort_natural_by(&mut videos, |v| v.original_name.as_str());
        for (index, video) in videos.iter_mut().enumerate() {
            video.index = index;
        }
        let mut playlist = Self {
            id: id.into(),
            name: name.into(),
            videos,
            ..Self::default()
        };
        playlist.refresh_totals();
        playlist
    }

    /// Recompute the count and size fields from `videos`.
    pub fn refresh_totals(&mut self) {
        for video in &mut self.videos {
            if video.size.is_empty() {
                video.size = format_size(video.size_bytes);
            }
        }
        self.video_count = self.videos.len();
        self.total_bytes = self.videos.iter().map(|v| v.size_bytes).sum();
        self.total_size = format_size(self.total_bytes);
    }

    /// Whether this is the synthetic root playlist.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id == ROOT_PLAYLIST_ID
    }

    /// Number of watched videos.
    #[must_use]
    pub fn watched_count(&self) -> usize {
        self.videos.iter().filter(|v| v.is_watched()).count()
    }

    /// Whether every video has been watched.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.videos.iter().all(Video::is_watched)
    }

    /// Find a video by id.
    #[must_use]
    pub fn find_video(&self, video_id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == video_id)
    }

    /// Video that follows the one at `index`, for autoplay.
    #[must_use]
    pub fn next_video(&self, index: usize) -> Option<&Video> {
        self.videos.get(index.checked_add(1)?)
    }
}

/// One imported root directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Channel {
    /// Generated id, stable for the lifetime of the import.
    pub id: String,
    /// Directory name at import time.
    pub folder_name: String,
    /// Name shown to the user.
    pub display_name: String,
    /// Display label such as `@local_lectures`. Not a capability.
    pub handle: String,
    /// Root playlist first, then subdirectories in natural order.
    pub playlists: Vec<Playlist>,
}

impl Channel {
    /// Create a channel for a freshly imported directory.
    pub fn new(id: impl Into<String>, folder_name: impl Into<String>, playlists: Vec<Playlist>) -> Self {
        let folder_name = folder_name.into();
        Self {
            id: id.into(),
            handle: handle_label(&folder_name),
            display_name: folder_name.clone(),
            folder_name,
            playlists,
        }
    }

    /// Find a playlist by id.
    #[must_use]
    pub fn find_playlist(&self, playlist_id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == playlist_id)
    }

    /// Find a video by id in any playlist.
    #[must_use]
    pub fn find_video(&self, video_id: &str) -> Option<&Video> {
        self.playlists.iter().find_map(|p| p.find_video(video_id))
    }

    /// Total number of videos across playlists.
    #[must_use]
    pub fn video_count(&self) -> usize {
        self.playlists.iter().map(|p| p.videos.len()).sum()
    }

    /// Recompute derived playlist fields, e.g. after loading stored state.
    pub fn refresh_totals(&mut self) {
        self.playlists.iter_mut().for_each(Playlist::refresh_totals);
    }
}

/// Display label for a channel: `@local_` plus the lowercased folder name
/// with whitespace removed.
#[must_use]
pub fn handle_label(folder_name: &str) -> String {
    let compact: String = folder_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    format!("@local_{compact}")
}

fn videos_from(files: Vec<ScannedFile>) -> Vec<Video> {
    files
        .into_iter()
        .map(|f| Video::new(f.relative_path, f.name, f.size_bytes))
        .collect()
}

/// Turn a scan result into the ordered, indexed playlist list.
///
/// The root playlist comes first when the root holds any videos; folders
/// without videos are dropped; remaining folders follow in natural order.
#[must_use]
pub fn assemble(scan: ScannedDirectory) -> Vec<Playlist> {
    let mut playlists: Vec<Playlist> = scan
        .folders
        .into_iter()
        .filter(|folder| !folder.videos.is_empty())
        .map(|folder| {
            let videos = videos_from(folder.videos);
            Playlist::from_videos(folder.name.clone(), folder.name, videos)
        })
        .collect();
    playlists.sort_by(|a, b| natural_cmp(&a.name, &b.name));

    if !scan.root_videos.is_empty() {
        let root = Playlist::from_videos(
            ROOT_PLAYLIST_ID,
            ROOT_PLAYLIST_NAME,
            videos_from(scan.root_videos),
        );
        playlists.insert(0, root);
    }

    playlists
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::scanner::ScannedFolder;

    fn file(relative_path: &str, size_bytes: u64) -> ScannedFile {
        let name = relative_path.rsplit('/').next().unwrap().to_string();
        ScannedFile {
            name,
            relative_path: relative_path.to_string(),
            size_bytes,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_size(1_288_490_189), "1.2 GB");
        assert_eq!(format_size(3 * 1024_u64.pow(4)), "3 TB");
        assert_eq!(format_size(2048 * 1024_u64.pow(4)), "2048 TB");
    }

    #[test]
    fn test_root_file_and_subdirectory() {
        let scan = ScannedDirectory {
            root_videos: vec![file("intro.mp4", 10)],
            folders: vec![ScannedFolder {
                name: "Season 1".to_string(),
                videos: vec![file("Season 1/ep10.mkv", 5), file("Season 1/ep2.mkv", 7)],
            }],
        };

        let playlists = assemble(scan);
        assert_eq!(playlists.len(), 2);

        assert_eq!(playlists[0].name, ROOT_PLAYLIST_NAME);
        assert!(playlists[0].is_root());
        assert_eq!(playlists[0].video_count, 1);
        assert_eq!(playlists[0].videos[0].index, 0);

        assert_eq!(playlists[1].id, "Season 1");
        assert_eq!(playlists[1].video_count, 2);
        assert_eq!(playlists[1].videos[0].original_name, "ep2.mkv");
        assert_eq!(playlists[1].videos[0].index, 0);
        assert_eq!(playlists[1].videos[1].original_name, "ep10.mkv");
        assert_eq!(playlists[1].videos[1].index, 1);
        assert_eq!(playlists[1].total_bytes, 12);
        assert_eq!(playlists[1].total_size, "12 B");
    }

    #[test]
    fn test_empty_folder_is_omitted() {
        let scan = ScannedDirectory {
            root_videos: vec![],
            folders: vec![
                ScannedFolder {
                    name: "Empty".to_string(),
                    videos: vec![],
                },
                ScannedFolder {
                    name: "Full".to_string(),
                    videos: vec![file("Full/a.mp4", 1)],
                },
            ],
        };

        let playlists = assemble(scan);
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].id, "Full");
    }

    #[test]
    fn test_folders_sorted_naturally() {
        let folder = |name: &str| ScannedFolder {
            name: name.to_string(),
            videos: vec![file(&format!("{name}/x.mp4"), 1)],
        };
        let scan = ScannedDirectory {
            root_videos: vec![],
            folders: vec![folder("Part 10"), folder("part 2"), folder("Part 1")],
        };

        let names: Vec<String> = assemble(scan).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Part 1", "part 2", "Part 10"]);
    }

    #[test]
    fn test_video_ids_and_titles() {
        let scan = ScannedDirectory {
            root_videos: vec![file("Show.S01E01.[Grp].720p.mp4", 1)],
            folders: vec![ScannedFolder {
                name: "Extras".to_string(),
                videos: vec![file("Extras/making_of.webm", 1)],
            }],
        };

        let playlists = assemble(scan);
        let root = &playlists[0].videos[0];
        assert_eq!(root.id, "Show.S01E01.[Grp].720p.mp4");
        assert_eq!(root.path, root.id);
        assert_eq!(root.title, "Show S01E01");

        let extra = &playlists[1].videos[0];
        assert_eq!(extra.id, "Extras/making_of.webm");
        assert_eq!(extra.title, "making of");
        assert_eq!(extra.playback, PlaybackState::NotStarted);
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let make = |order: &[&str]| ScannedDirectory {
            root_videos: order.iter().map(|n| file(n, 1)).collect(),
            folders: vec![],
        };
        let a = assemble(make(&["b.mp4", "a.mp4", "10.mp4", "9.mp4"]));
        let b = assemble(make(&["9.mp4", "10.mp4", "a.mp4", "b.mp4"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_playlist_watch_stats_and_next() {
        let mut playlist = Playlist::from_videos(
            "A",
            "A",
            vec![Video::new("A/1.mp4", "1.mp4", 1), Video::new("A/2.mp4", "2.mp4", 1)],
        );
        assert_eq!(playlist.watched_count(), 0);
        assert!(!playlist.is_finished());
        assert_eq!(playlist.next_video(0).map(|v| v.id.as_str()), Some("A/2.mp4"));
        assert!(playlist.next_video(1).is_none());

        for video in &mut playlist.videos {
            video.playback = PlaybackState::Watched {
                current_time: 10.0,
                duration: 10.0,
            };
        }
        assert_eq!(playlist.watched_count(), 2);
        assert!(playlist.is_finished());
    }

    #[test]
    fn test_handle_label() {
        assert_eq!(handle_label("My Lectures 2024"), "@local_mylectures2024");
    }

    #[test]
    fn test_channel_lookup() {
        let channel = Channel::new(
            "c1",
            "Videos",
            vec![Playlist::from_videos("A", "A", vec![Video::new("A/1.mp4", "1.mp4", 1)])],
        );
        assert_eq!(channel.display_name, "Videos");
        assert_eq!(channel.handle, "@local_videos");
        assert!(channel.find_playlist("A").is_some());
        assert!(channel.find_video("A/1.mp4").is_some());
        assert!(channel.find_video("B/1.mp4").is_none());
        assert_eq!(channel.video_count(), 1);
    }

    #[test]
    fn test_playback_state_accessors() {
        let state = PlaybackState::InProgress {
            current_time: 30.0,
            duration: 120.0,
        };
        assert_eq!(state.current_time(), Some(30.0));
        assert_eq!(state.duration(), Some(120.0));
        assert!(!state.is_watched());
        assert_eq!(state.resume_position(), 30.0);
        assert_eq!(state.fraction(), 0.25);
        assert_eq!(PlaybackState::NotStarted.resume_position(), 0.0);
    }

    #[test]
    fn test_playback_state_serialization() {
        let state = PlaybackState::InProgress {
            current_time: 120.0,
            duration: 600.0,
        };
        let json = serde_json::to_string(&state).expect("serialize failed");
        assert!(json.contains("\"state\":\"inProgress\""));
        assert!(json.contains("\"currentTime\":120.0"));
        let back: PlaybackState = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(back, state);
    }

    #[test]
    fn test_video_missing_fields_default() {
        let video: Video =
            serde_json::from_str(r#"{"id":"a.mp4","title":"a","futureField":true}"#)
                .expect("deserialize failed");
        assert_eq!(video.id, "a.mp4");
        assert_eq!(video.playback, PlaybackState::NotStarted);
        assert_eq!(video.size_bytes, 0);
    }

    #[test]
    fn test_playback_state_null_seconds_read_as_zero() {
        let state: PlaybackState =
            serde_json::from_str(r#"{"state":"inProgress","currentTime":12.0,"duration":null}"#)
                .expect("deserialize failed");
        assert_eq!(
            state,
            PlaybackState::InProgress {
                current_time: 12.0,
                duration: 0.0,
            }
        );
        assert_eq!(state.fraction(), 0.0);
    }

    #[test]
    fn test_refresh_totals() {
        let mut playlist: Playlist = serde_json::from_str(
            r#"{"id":"A","videos":[{"id":"A/1.mp4","sizeBytes":1024},{"id":"A/2.mp4","sizeBytes":512}]}"#,
        )
        .expect("deserialize failed");
        assert_eq!(playlist.video_count, 0);

        playlist.refresh_totals();
        assert_eq!(playlist.video_count, 2);
        assert_eq!(playlist.total_bytes, 1536);
        assert_eq!(playlist.total_size, "1.5 KB");
        assert_eq!(playlist.videos[0].size, "1 KB");
    }
}
