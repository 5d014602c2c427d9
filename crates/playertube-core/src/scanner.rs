//! Directory scanning for a single channel.
//!
//! A channel root is walked exactly two levels deep: video files directly
//! in the root, and video files directly inside each immediate
//! subdirectory. Anything deeper is ignored. The result is unordered;
//! [`crate::catalog::assemble`] is responsible for ordering and indexing.

use tracing::{debug, info};

use crate::catalog::{Playlist, assemble};
use crate::error::ScanError;
use crate::fs::{DirectoryHandle, EntryKind, FileSystem};

/// File suffixes recognized as videos, compared case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 6] = [".mp4", ".mkv", ".webm", ".avi", ".mov", ".m4v"];

/// Check if a filename has a video extension.
#[must_use]
pub fn is_video_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Options controlling which entries the scanner visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Skip subdirectories whose name starts with `.`.
    pub skip_hidden_directories: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_hidden_directories: true,
        }
    }
}

/// A video file found during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Raw filename.
    pub name: String,
    /// Path relative to the channel root, `/`-separated.
    pub relative_path: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// An immediate subdirectory and the videos directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFolder {
    /// Directory name.
    pub name: String,
    /// Videos directly inside the directory.
    pub videos: Vec<ScannedFile>,
}

/// Unordered result of scanning one channel root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedDirectory {
    /// Videos directly in the root.
    pub root_videos: Vec<ScannedFile>,
    /// Subdirectories containing at least one video.
    pub folders: Vec<ScannedFolder>,
}

impl ScannedDirectory {
    /// Total number of videos found.
    #[must_use]
    pub fn video_count(&self) -> usize {
        self.root_videos.len() + self.folders.iter().map(|f| f.videos.len()).sum::<usize>()
    }
}

/// Scan a channel root with default options.
///
/// # Errors
///
/// Returns [`ScanError::RootUnreadable`] if the root cannot be listed, or
/// another [`ScanError`] if a subdirectory or file size cannot be read.
pub async fn scan_directory<F: FileSystem + ?Sized>(
    fs: &F,
    root: &DirectoryHandle,
) -> Result<ScannedDirectory, ScanError> {
    scan_directory_with_options(fs, root, ScanOptions::default()).await
}

/// Scan a channel root.
///
/// # Errors
///
/// See [`scan_directory`].
pub async fn scan_directory_with_options<F: FileSystem + ?Sized>(
    fs: &F,
    root: &DirectoryHandle,
    options: ScanOptions,
) -> Result<ScannedDirectory, ScanError> {
    let root_path = root.path();
    let entries = fs.read_dir(root_path).await.map_err(|e| ScanError::RootUnreadable {
        path: root_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut result = ScannedDirectory::default();

    for entry in entries {
        match entry.kind {
            EntryKind::File if is_video_file(&entry.name) => {
                let size_bytes = fs.file_size(&root_path.join(&entry.name)).await?;
                result.root_videos.push(ScannedFile {
                    relative_path: entry.name.clone(),
                    name: entry.name,
                    size_bytes,
                });
            }
            EntryKind::Directory
                if !(options.skip_hidden_directories && entry.name.starts_with('.')) =>
            {
                let folder_path = root_path.join(&entry.name);
                let mut videos = Vec::new();
                for child in fs.read_dir(&folder_path).await? {
                    if child.kind != EntryKind::File || !is_video_file(&child.name) {
                        continue;
                    }
                    let size_bytes = fs.file_size(&folder_path.join(&child.name)).await?;
                    videos.push(ScannedFile {
                        relative_path: format!("{}/{}", entry.name, child.name),
                        name: child.name,
                        size_bytes,
                    });
                }

                if videos.is_empty() {
                    debug!("Skipping folder without videos: {}", folder_path.display());
                } else {
                    debug!(
                        "Found {} video(s) in {}",
                        videos.len(),
                        folder_path.display()
                    );
                    result.folders.push(ScannedFolder {
                        name: entry.name,
                        videos,
                    });
                }
            }
            _ => {}
        }
    }

    info!(
        "Scanned {}: {} root video(s), {} folder(s)",
        root_path.display(),
        result.root_videos.len(),
        result.folders.len()
    );
    Ok(result)
}

/// Scan and assemble a channel root in one step, as done on first import.
///
/// # Errors
///
/// See [`scan_directory`].
pub async fn scan<F: FileSystem + ?Sized>(
    fs: &F,
    root: &DirectoryHandle,
) -> Result<Vec<Playlist>, ScanError> {
    scan_with_options(fs, root, ScanOptions::default()).await
}

/// Scan and assemble with explicit options.
///
/// # Errors
///
/// See [`scan_directory`].
pub async fn scan_with_options<F: FileSystem + ?Sized>(
    fs: &F,
    root: &DirectoryHandle,
    options: ScanOptions,
) -> Result<Vec<Playlist>, ScanError> {
    let scanned = scan_directory_with_options(fs, root, options).await?;
    Ok(assemble(scanned))
}
