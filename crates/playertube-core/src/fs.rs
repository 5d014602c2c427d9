//! File system abstraction for directory scanning and playback streams.
//!
//! The scanner never touches `std::fs` directly; it goes through the
//! [`FileSystem`] trait so it can be driven by an in-memory tree in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use playertube_core::fs::{DirectoryHandle, FileSystem, RealFileSystem};
//!
//! let fs = RealFileSystem::new();
//! let handle = DirectoryHandle::new("/home/me/Videos/Lectures");
//! for entry in fs.read_dir(handle.path()).await? {
//!     println!("{} ({:?})", entry.name, entry.kind);
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tracing::debug;

use crate::catalog::Video;
use crate::error::{Result, ScanError};

/// Converts an I/O error for directory listings.
fn read_dir_error(path: &Path, e: &io::Error) -> ScanError {
    ScanError::ReadDirFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Converts an I/O error for metadata lookups.
fn metadata_error(path: &Path, e: &io::Error) -> ScanError {
    ScanError::MetadataFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Capability for one directory the user picked.
///
/// The engine only ever holds this inside the handle store; channels keep
/// a display label instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryHandle {
    path: PathBuf,
    name: String,
}

impl DirectoryHandle {
    /// Create a handle for a directory path.
    ///
    /// The name is the final path component, or the full path when there
    /// is none (e.g. `/`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy())
            .into_owned();
        Self { path, name }
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory name at the time the handle was created.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a `/`-separated path relative to this directory.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.path.clone(), |acc, part| acc.join(part))
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// An immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (not a path).
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
}

impl DirEntry {
    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Readable byte stream for a single video.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Abstraction over the read-only file system operations the engine needs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// List the immediate children of a directory.
    ///
    /// Entries that are neither files nor directories (sockets, broken
    /// links) are omitted.
    async fn read_dir(&self, path: &Path) -> std::result::Result<Vec<DirEntry>, ScanError>;

    /// Whether `path` exists and is a directory.
    async fn is_dir(&self, path: &Path) -> bool;

    /// Size of a file in bytes.
    async fn file_size(&self, path: &Path) -> std::result::Result<u64, ScanError>;

    /// Open a file for a single sequential read.
    async fn open_read(&self, path: &Path) -> Result<ByteStream>;
}

/// Real file system implementation on top of `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    /// Create a new real file system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn read_dir(&self, path: &Path) -> std::result::Result<Vec<DirEntry>, ScanError> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| read_dir_error(path, &e))?;

        let mut result = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| read_dir_error(path, &e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                debug!("Skipping non UTF-8 entry in {}", path.display());
                continue;
            };
            // Follow symlinks so linked folders and files behave like the real thing.
            let entry_path = entry.path();
            let meta = match tokio::fs::metadata(&entry_path).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Skipping dangling entry {}", entry_path.display());
                    continue;
                }
                Err(e) => return Err(metadata_error(&entry_path, &e)),
            };
            if meta.is_dir() {
                result.push(DirEntry::directory(name));
            } else if meta.is_file() {
                result.push(DirEntry::file(name));
            }
        }
        Ok(result)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
    }

    async fn file_size(&self, path: &Path) -> std::result::Result<u64, ScanError> {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|e| metadata_error(path, &e))
    }

    async fn open_read(&self, path: &Path) -> Result<ByteStream> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }
}

/// Open the byte stream for a video in a channel directory.
///
/// The stream is meant for one playback session and is not cached.
pub async fn open_video<F: FileSystem + ?Sized>(
    fs: &F,
    root: &DirectoryHandle,
    video: &Video,
) -> Result<ByteStream> {
    fs.open_read(&root.resolve(&video.path)).await
}
