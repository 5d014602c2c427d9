//! `PlayerTube` Core Library
//!
//! This crate provides the engine behind `PlayerTube`, a personal video
//! library built from folders on the local disk:
//! - Scanning a folder two levels deep into channels, playlists and videos
//! - Title cleanup and natural ordering of episode files
//! - Syncing every channel against its directory while keeping playback
//!   progress
//! - Recording playback progress and watched state
//! - Persisting the library, directory handles and configuration
//!
//! # Error Handling
//!
//! Fallible operations return [`Result`]. Per-channel failures during a
//! sync never surface as errors; they are reported in the
//! [`SyncOutcome`] instead.
//!
//! ```rust,ignore
//! use playertube_core::{Library, SyncOrchestrator, SyncProgress};
//!
//! let mut library = Library::new(orchestrator);
//! library.import_folder(&picker).await?;
//! let outcome = library.sync(None::<fn(&SyncProgress)>).await;
//! println!("{}", outcome.summary());
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod fs;
pub mod handle_store;
pub mod library;
pub mod merge;
pub mod order;
pub mod permission;
pub mod progress;
pub mod scanner;
pub mod selection;
pub mod snapshot;
pub mod sync;
pub mod title;

pub use catalog::{
    Channel, PlaybackState, Playlist, ROOT_PLAYLIST_ID, ROOT_PLAYLIST_NAME, Video, assemble,
    format_size, handle_label,
};
pub use config::{AppConfig, default_handles_file, default_library_file};
pub use error::{Error, ImportError, Result, ScanError};
pub use fs::{
    ByteStream, DirEntry, DirectoryHandle, EntryKind, FileSystem, RealFileSystem, open_video,
};
pub use handle_store::{HandleStore, JsonHandleStore, MemoryHandleStore};
pub use library::{DirectoryPicker, Library};
pub use merge::merge_playlists;
pub use order::{natural_cmp, sort_natural_by};
pub use permission::{FsPermissionGate, PermissionGate, PermissionState};
pub use progress::{WATCHED_THRESHOLD, record_progress, record_progress_with_threshold};
pub use scanner::{
    ScanOptions, ScannedDirectory, ScannedFile, ScannedFolder, VIDEO_EXTENSIONS, is_video_file,
    scan, scan_directory, scan_directory_with_options, scan_with_options,
};
pub use selection::{ResolvedSelection, Selection};
pub use snapshot::{LibrarySnapshot, SNAPSHOT_VERSION};
pub use sync::{
    ChannelSyncReport, ChannelSyncStatus, SyncOptions, SyncOrchestrator, SyncOutcome,
    SyncProgress,
};
pub use title::clean_title;
