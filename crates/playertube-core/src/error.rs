//! Error types for PlayerTube core operations.
//!
//! Per-channel failures during a sync pass ([`Error::PermissionDenied`],
//! [`Error::HandleMissing`], [`Error::Scan`]) are never fatal: the
//! orchestrator converts them into a report entry and keeps the channel's
//! previous catalog. Import and re-link failures ([`Error::Import`]) are
//! returned to the immediate caller and never touch the existing collection.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in PlayerTube core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Read access was not granted for a channel's directory.
    #[error("Permission denied for channel {channel_id}")]
    PermissionDenied {
        /// Channel whose directory could not be read.
        channel_id: String,
    },

    /// No stored directory capability exists for a channel.
    #[error("No directory handle stored for channel {channel_id}")]
    HandleMissing {
        /// Channel without a stored handle.
        channel_id: String,
    },

    /// Directory enumeration or metadata retrieval failed.
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    /// A user-initiated import or re-link failed.
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// The handle store could not be read or written.
    #[error("Handle store error: {0}")]
    HandleStore(String),

    /// The persisted library snapshot could not be read or written.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// No channel with the given id exists in the collection.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures raised while walking a channel directory.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    /// The channel root itself could not be listed (revoked or missing).
    #[error("Channel root {path} is unreadable: {reason}")]
    RootUnreadable {
        /// Root directory path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A playlist subdirectory could not be listed.
    #[error("Failed to read directory {path}: {reason}")]
    ReadDirFailed {
        /// Directory path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A video file's size could not be retrieved.
    #[error("Failed to read metadata for {path}: {reason}")]
    MetadataFailed {
        /// File path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },
}

/// Failures raised by import and re-link operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImportError {
    /// The user dismissed the directory picker.
    #[error("Import cancelled")]
    Cancelled,

    /// The picked path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory {
        /// Picked path.
        path: PathBuf,
    },

    /// The picked directory could not be registered in the handle store.
    #[error("Failed to register directory handle: {reason}")]
    HandleStore {
        /// Underlying reason.
        reason: String,
    },

    /// The initial scan of the picked directory failed.
    #[error("Initial scan failed: {0}")]
    Scan(ScanError),
}
