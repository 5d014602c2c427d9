//! Sync orchestrator for refreshing every channel against its directory.
//!
//! For each channel, in collection order:
//! 1. Resolve the directory handle from the [`HandleStore`]
//! 2. Check read access through the [`PermissionGate`], asking once if needed
//! 3. Rescan, reassemble and merge against the channel's current playlists
//!
//! A channel that fails at any step keeps its previous playlists and the
//! pass moves on. Channels are processed one at a time so that at most one
//! permission prompt is pending.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use playertube_core::{FsPermissionGate, JsonHandleStore, RealFileSystem, SyncOrchestrator};
//!
//! let orchestrator = SyncOrchestrator::new(
//!     Arc::new(JsonHandleStore::new("handles.json")),
//!     Arc::new(FsPermissionGate::new()),
//!     Arc::new(RealFileSystem::new()),
//! );
//! let outcome = orchestrator.sync(&channels, None::<fn(&SyncProgress)>).await;
//! println!("{}", outcome.summary());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{Channel, Playlist};
use crate::error::{Error, Result};
use crate::fs::{DirectoryHandle, FileSystem};
use crate::handle_store::HandleStore;
use crate::merge::merge_playlists;
use crate::permission::{PermissionGate, PermissionState};
use crate::scanner::{ScanOptions, scan_with_options};

// =============================================================================
// Sync Options
// =============================================================================

/// Configuration options for a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Ask for permission when the gate reports [`PermissionState::Prompt`].
    pub request_permission: bool,
    /// Options passed to the directory scanner.
    pub scan: ScanOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            request_permission: true,
            scan: ScanOptions::default(),
        }
    }
}

impl SyncOptions {
    /// Set whether to ask for permission on prompt.
    #[must_use]
    pub const fn with_request_permission(mut self, enabled: bool) -> Self {
        self.request_permission = enabled;
        self
    }

    /// Set the scan options.
    #[must_use]
    pub const fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }
}

// =============================================================================
// Sync Progress and Results
// =============================================================================

/// Progress notification sent before each channel is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// 1-based position of the channel in the collection.
    pub current: usize,
    /// Number of channels in the pass.
    pub total: usize,
    /// Channel about to be processed.
    pub channel_id: String,
    /// Display name of that channel.
    pub channel_name: String,
}

/// What happened to one channel during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ChannelSyncStatus {
    /// Rescanned and merged.
    Refreshed {
        /// Playlists after the merge.
        playlists: usize,
        /// Videos after the merge.
        videos: usize,
    },
    /// No stored handle; channel left unchanged.
    HandleMissing,
    /// Read access not granted; channel left unchanged.
    PermissionDenied,
    /// Resolve, authorize or scan failed; channel left unchanged.
    Failed {
        /// Error description.
        reason: String,
    },
    /// The pass was cancelled before this channel was reached.
    Skipped,
}

impl ChannelSyncStatus {
    /// Whether the channel's playlists were replaced.
    #[must_use]
    pub const fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed { .. })
    }
}

impl fmt::Display for ChannelSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refreshed { playlists, videos } => {
                write!(f, "refreshed ({playlists} playlists, {videos} videos)")
            }
            Self::HandleMissing => write!(f, "no stored directory"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-channel entry of a [`SyncOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSyncReport {
    /// Channel id.
    pub channel_id: String,
    /// Outcome for this channel.
    pub status: ChannelSyncStatus,
}

/// Result of a sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Updated collection, in the same order as the input.
    pub channels: Vec<Channel>,
    /// One report per channel, in the same order.
    pub reports: Vec<ChannelSyncReport>,
    /// Whether the pass was cancelled.
    pub was_cancelled: bool,
    /// Duration of the pass in seconds.
    pub duration_secs: f64,
}

impl SyncOutcome {
    /// Number of channels that were refreshed.
    #[must_use]
    pub fn refreshed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.status.is_refreshed()).count()
    }

    /// Get a summary of the pass.
    #[must_use]
    pub fn summary(&self) -> String {
        let total = self.reports.len();
        let refreshed = self.refreshed_count();
        if self.was_cancelled {
            format!("Sync cancelled: {refreshed} of {total} channel(s) refreshed")
        } else if refreshed == total {
            format!(
                "Library synchronized: {total} channel(s) refreshed in {:.2}s",
                self.duration_secs
            )
        } else {
            format!(
                "Library synchronized: {refreshed} of {total} channel(s) refreshed, {} kept previous data",
                total - refreshed
            )
        }
    }
}

// =============================================================================
// Sync Orchestrator
// =============================================================================

/// Orchestrator for refreshing channels from their directories.
pub struct SyncOrchestrator {
    handles: Arc<dyn HandleStore>,
    gate: Arc<dyn PermissionGate>,
    fs: Arc<dyn FileSystem>,
    options: SyncOptions,
    cancelled: Arc<AtomicBool>,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("options", &self.options)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    /// Create a new orchestrator with default options.
    pub fn new(
        handles: Arc<dyn HandleStore>,
        gate: Arc<dyn PermissionGate>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            handles,
            gate,
            fs,
            options: SyncOptions::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the sync options.
    #[must_use]
    pub const fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a shared cancellation flag.
    #[must_use]
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Request cancellation. Channels not yet started keep their data.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Get a cancellation token that can be shared across tasks.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Handle store used by this orchestrator.
    #[must_use]
    pub fn handle_store(&self) -> &Arc<dyn HandleStore> {
        &self.handles
    }

    /// File system used by this orchestrator.
    #[must_use]
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Scanner options in effect.
    #[must_use]
    pub const fn scan_options(&self) -> ScanOptions {
        self.options.scan
    }

    /// Refresh every channel, preserving playback progress.
    ///
    /// Never fails: a channel that cannot be refreshed is returned
    /// unchanged and reported in [`SyncOutcome::reports`].
    pub async fn sync<F>(&self, channels: &[Channel], progress_callback: Option<F>) -> SyncOutcome
    where
        F: Fn(&SyncProgress) + Send + Sync,
    {
        let start_time = Instant::now();
        let total = channels.len();
        let mut updated = Vec::with_capacity(total);
        let mut reports = Vec::with_capacity(total);
        let mut was_cancelled = false;

        info!("Starting sync of {} channel(s)", total);

        for (position, channel) in channels.iter().enumerate() {
            if self.is_cancelled() {
                was_cancelled = true;
                debug!("Sync cancelled, leaving channel {} untouched", channel.id);
                updated.push(channel.clone());
                reports.push(ChannelSyncReport {
                    channel_id: channel.id.clone(),
                    status: ChannelSyncStatus::Skipped,
                });
                continue;
            }

            if let Some(cb) = &progress_callback {
                cb(&SyncProgress {
                    current: position + 1,
                    total,
                    channel_id: channel.id.clone(),
                    channel_name: channel.display_name.clone(),
                });
            }

            let status = match self.sync_channel(channel).await {
                Ok(playlists) => {
                    let refreshed = Channel {
                        playlists,
                        ..channel.clone()
                    };
                    let status = ChannelSyncStatus::Refreshed {
                        playlists: refreshed.playlists.len(),
                        videos: refreshed.video_count(),
                    };
                    updated.push(refreshed);
                    status
                }
                Err(e) => {
                    updated.push(channel.clone());
                    match e {
                        Error::HandleMissing { .. } => {
                            debug!("No stored directory for channel {}", channel.id);
                            ChannelSyncStatus::HandleMissing
                        }
                        Error::PermissionDenied { .. } => {
                            warn!("Read access not granted for channel {}", channel.id);
                            ChannelSyncStatus::PermissionDenied
                        }
                        other => {
                            error!("Sync failed for channel {}: {}", channel.id, other);
                            ChannelSyncStatus::Failed {
                                reason: other.to_string(),
                            }
                        }
                    }
                }
            };

            info!("Channel {} ({}): {}", channel.display_name, channel.id, status);
            reports.push(ChannelSyncReport {
                channel_id: channel.id.clone(),
                status,
            });
        }

        let outcome = SyncOutcome {
            channels: updated,
            reports,
            was_cancelled,
            duration_secs: start_time.elapsed().as_secs_f64(),
        };
        info!("{}", outcome.summary());
        outcome
    }

    /// Resolve, authorize and rescan one channel.
    async fn sync_channel(&self, channel: &Channel) -> Result<Vec<Playlist>> {
        let handle = self
            .handles
            .get(&channel.id)
            .await?
            .ok_or_else(|| Error::HandleMissing {
                channel_id: channel.id.clone(),
            })?;

        if !self.authorize(&channel.id, &handle).await? {
            return Err(Error::PermissionDenied {
                channel_id: channel.id.clone(),
            });
        }

        self.rescan(&channel.playlists, &handle).await
    }

    /// Query read access, asking once when the gate says to prompt.
    async fn authorize(&self, channel_id: &str, handle: &DirectoryHandle) -> Result<bool> {
        let mut state = self.gate.query(handle).await?;

        if state == PermissionState::Prompt && self.options.request_permission {
            state = match self.gate.request(handle).await {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "Permission request failed for channel {}: {}",
                        channel_id, e
                    );
                    PermissionState::Denied
                }
            };
        }

        debug!("Permission for channel {}: {}", channel_id, state);
        Ok(state == PermissionState::Granted)
    }

    /// Scan a directory and merge it against existing playlists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`] if the directory cannot be read.
    pub async fn rescan(
        &self,
        previous: &[Playlist],
        handle: &DirectoryHandle,
    ) -> Result<Vec<Playlist>> {
        let fresh = scan_with_options(self.fs.as_ref(), handle, self.options.scan).await?;
        Ok(merge_playlists(fresh, previous))
    }
}
