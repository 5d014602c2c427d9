//! The channel collection and the operations that change it.
//!
//! [`Library`] owns the in-memory collection and the active selection and
//! applies user actions to them: importing a folder, re-linking a channel
//! whose directory moved, removing a channel, syncing, and recording
//! playback progress. Every operation either succeeds completely or leaves
//! the collection as it was.

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{Channel, Video};
use crate::error::{Error, ImportError, Result};
use crate::fs::DirectoryHandle;
use crate::progress::{WATCHED_THRESHOLD, record_progress_with_threshold};
use crate::scanner::scan_with_options;
use crate::selection::{ResolvedSelection, Selection};
use crate::snapshot::LibrarySnapshot;
use crate::sync::{SyncOrchestrator, SyncOutcome, SyncProgress};

/// Lets the user choose a directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryPicker: Send + Sync {
    /// Ask for a directory. `None` means the user cancelled.
    async fn pick(&self) -> Result<Option<DirectoryHandle>>;
}

/// The user's channel collection.
#[derive(Debug)]
pub struct Library {
    channels: Vec<Channel>,
    selection: Selection,
    orchestrator: SyncOrchestrator,
    watched_threshold: f64,
}

impl Library {
    /// Create an empty library.
    #[must_use]
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        Self {
            channels: Vec::new(),
            selection: Selection::default(),
            orchestrator,
            watched_threshold: WATCHED_THRESHOLD,
        }
    }

    /// Restore a library from a snapshot.
    ///
    /// Selection ids that do not resolve against the restored channels are
    /// dropped.
    #[must_use]
    pub fn from_snapshot(snapshot: LibrarySnapshot, orchestrator: SyncOrchestrator) -> Self {
        let selection = snapshot.selection.retain_valid(&snapshot.channels);
        Self {
            channels: snapshot.channels,
            selection,
            orchestrator,
            watched_threshold: WATCHED_THRESHOLD,
        }
    }

    /// Set the fraction played at which a video counts as watched.
    #[must_use]
    pub const fn with_watched_threshold(mut self, threshold: f64) -> Self {
        self.watched_threshold = threshold;
        self
    }

    /// Channels in import order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Find a channel by id.
    #[must_use]
    pub fn channel(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == channel_id)
    }

    /// Active selection ids.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Active selection resolved against the current channels.
    #[must_use]
    pub fn active(&self) -> ResolvedSelection<'_> {
        self.selection.resolve(&self.channels)
    }

    /// Orchestrator used for syncs and rescans.
    #[must_use]
    pub const fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    /// Current state as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> LibrarySnapshot {
        LibrarySnapshot::new(self.channels.clone(), self.selection.clone())
    }

    /// Change the active selection.
    ///
    /// Playlist and video ids that do not resolve are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] if the selected channel does not
    /// exist.
    pub fn select(&mut self, selection: Selection) -> Result<ResolvedSelection<'_>> {
        if let Some(id) = &selection.channel_id
            && self.channel(id).is_none()
        {
            return Err(Error::ChannelNotFound(id.clone()));
        }
        self.selection = selection.retain_valid(&self.channels);
        Ok(self.active())
    }

    /// Pick a directory and add it as a new channel.
    ///
    /// The directory is scanned once, the new channel gets a random id and
    /// its handle is registered before the channel is appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Import`] if the picker is dismissed, the pick is not
    /// a directory, the scan fails or the handle cannot be stored. The
    /// collection is unchanged in every case.
    pub async fn import_folder(&mut self, picker: &dyn DirectoryPicker) -> Result<&Channel> {
        let handle = self.pick_directory(picker).await?;
        let playlists = scan_with_options(
            self.orchestrator.file_system().as_ref(),
            &handle,
            self.orchestrator.scan_options(),
        )
        .await
        .map_err(ImportError::Scan)?;

        let id = Uuid::new_v4().to_string();
        self.orchestrator
            .handle_store()
            .save(&id, &handle)
            .await
            .map_err(|e| ImportError::HandleStore {
                reason: e.to_string(),
            })?;

        let channel = Channel::new(id, handle.name(), playlists);
        info!(
            "Imported {} as channel {} ({} videos)",
            handle.path().display(),
            channel.id,
            channel.video_count()
        );
        self.channels.push(channel);
        Ok(&self.channels[self.channels.len() - 1])
    }

    /// Point an existing channel at a new directory.
    ///
    /// The channel keeps its id, name and playback progress; its playlists
    /// are rescanned from the new directory right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] for an unknown id, or
    /// [`Error::Import`] as for [`Library::import_folder`].
    pub async fn relink_channel(
        &mut self,
        channel_id: &str,
        picker: &dyn DirectoryPicker,
    ) -> Result<&Channel> {
        let index = self
            .channels
            .iter()
            .position(|c| c.id == channel_id)
            .ok_or_else(|| Error::ChannelNotFound(channel_id.to_string()))?;

        let handle = self.pick_directory(picker).await?;
        let playlists = self
            .orchestrator
            .rescan(&self.channels[index].playlists, &handle)
            .await
            .map_err(|e| match e {
                Error::Scan(scan) => Error::Import(ImportError::Scan(scan)),
                other => other,
            })?;

        self.orchestrator
            .handle_store()
            .save(channel_id, &handle)
            .await
            .map_err(|e| ImportError::HandleStore {
                reason: e.to_string(),
            })?;

        info!(
            "Re-linked channel {} to {}",
            channel_id,
            handle.path().display()
        );
        let channel = &mut self.channels[index];
        channel.playlists = playlists;
        self.selection = self.selection.retain_valid(&self.channels);
        Ok(&self.channels[index])
    }

    /// Remove a channel and forget its directory handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] for an unknown id, or the handle
    /// store's error if the handle cannot be deleted.
    pub async fn remove_channel(&mut self, channel_id: &str) -> Result<Channel> {
        let index = self
            .channels
            .iter()
            .position(|c| c.id == channel_id)
            .ok_or_else(|| Error::ChannelNotFound(channel_id.to_string()))?;

        self.orchestrator.handle_store().delete(channel_id).await?;
        let removed = self.channels.remove(index);
        self.selection = self.selection.retain_valid(&self.channels);

        info!("Removed channel {} ({})", removed.display_name, removed.id);
        Ok(removed)
    }

    /// Refresh every channel from its directory.
    ///
    /// Channels that cannot be refreshed keep their previous data. The
    /// selection is re-resolved against the refreshed collection.
    pub async fn sync<F>(&mut self, progress_callback: Option<F>) -> SyncOutcome
    where
        F: Fn(&SyncProgress) + Send + Sync,
    {
        let outcome = self
            .orchestrator
            .sync(&self.channels, progress_callback)
            .await;
        self.channels.clone_from(&outcome.channels);

        let selection = self.selection.retain_valid(&self.channels);
        if selection != self.selection {
            debug!("Selection narrowed after sync: {:?}", selection);
        }
        self.selection = selection;
        outcome
    }

    /// Record playback progress for a video.
    ///
    /// Returns the updated video, or `None` if no video has that id.
    pub fn record_progress(
        &mut self,
        video_id: &str,
        current_time: f64,
        duration: f64,
    ) -> Option<&Video> {
        if !self.channels.iter().any(|c| c.find_video(video_id).is_some()) {
            warn!("Progress reported for unknown video {}", video_id);
            return None;
        }
        self.channels = record_progress_with_threshold(
            &self.channels,
            video_id,
            current_time,
            duration,
            self.watched_threshold,
        );
        self.channels.iter().find_map(|c| c.find_video(video_id))
    }

    async fn pick_directory(&self, picker: &dyn DirectoryPicker) -> Result<DirectoryHandle> {
        let handle = picker.pick().await?.ok_or(ImportError::Cancelled)?;
        if !self.orchestrator.file_system().is_dir(handle.path()).await {
            return Err(ImportError::NotADirectory {
                path: handle.path().to_path_buf(),
            }
            .into());
        }
        Ok(handle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::PlaybackState;
    use crate::fs::mock::MockFileSystem;
    use crate::handle_store::{HandleStore, MemoryHandleStore, MockHandleStore};
    use crate::permission::{MockPermissionGate, PermissionState};

    fn mock_fs() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/media/My Lectures/intro.mp4", 10);
        fs.add_file("/media/My Lectures/Week 1/1.mp4", 10);
        fs.add_file("/media/My Lectures/Week 1/2.mp4", 10);
        fs.add_file("/media/Moved/Week 1/1.mp4", 10);
        fs.add_file("/media/Moved/Week 2/1.mp4", 10);
        fs.add_file("/media/notes.txt", 1);
        fs
    }

    fn granting_gate() -> MockPermissionGate {
        let mut gate = MockPermissionGate::new();
        gate.expect_query()
            .returning(|_| Ok(PermissionState::Granted));
        gate
    }

    fn picker(path: Option<&'static str>) -> MockDirectoryPicker {
        let mut picker = MockDirectoryPicker::new();
        picker
            .expect_pick()
            .returning(move || Ok(path.map(DirectoryHandle::new)));
        picker
    }

    fn library_with(store: Arc<dyn HandleStore>, fs: MockFileSystem) -> Library {
        Library::new(SyncOrchestrator::new(
            store,
            Arc::new(granting_gate()),
            Arc::new(fs),
        ))
    }

    #[tokio::test]
    async fn test_import_folder() {
        let store = Arc::new(MemoryHandleStore::new());
        let mut library = library_with(store.clone(), mock_fs());

        let channel = library
            .import_folder(&picker(Some("/media/My Lectures")))
            .await
            .unwrap()
            .clone();

        assert!(Uuid::parse_str(&channel.id).is_ok());
        assert_eq!(channel.display_name, "My Lectures");
        assert_eq!(channel.handle, "@local_mylectures");
        assert_eq!(channel.playlists.len(), 2);
        assert_eq!(channel.video_count(), 3);
        assert_eq!(library.channels().len(), 1);

        let stored = store.get(&channel.id).await.unwrap().unwrap();
        assert_eq!(stored.path(), std::path::Path::new("/media/My Lectures"));
    }

    #[tokio::test]
    async fn test_import_cancelled() {
        let mut library = library_with(Arc::new(MemoryHandleStore::new()), mock_fs());
        let err = library.import_folder(&picker(None)).await.unwrap_err();
        assert!(matches!(err, Error::Import(ImportError::Cancelled)));
        assert!(library.channels().is_empty());
    }

    #[tokio::test]
    async fn test_import_not_a_directory() {
        let mut library = library_with(Arc::new(MemoryHandleStore::new()), mock_fs());
        let err = library
            .import_folder(&picker(Some("/media/notes.txt")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Import(ImportError::NotADirectory { .. })
        ));
        assert!(library.channels().is_empty());
    }

    #[tokio::test]
    async fn test_import_scan_failure_stores_nothing() {
        let fs = mock_fs();
        fs.revoke("/media/My Lectures/Week 1");
        let mut store = MockHandleStore::new();
        store.expect_save().never();

        let mut library = library_with(Arc::new(store), fs);
        let err = library
            .import_folder(&picker(Some("/media/My Lectures")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Import(ImportError::Scan(_))));
        assert!(library.channels().is_empty());
    }

    #[tokio::test]
    async fn test_import_handle_store_failure() {
        let mut store = MockHandleStore::new();
        store
            .expect_save()
            .returning(|_, _| Err(Error::HandleStore("disk full".to_string())));

        let mut library = library_with(Arc::new(store), mock_fs());
        let err = library
            .import_folder(&picker(Some("/media/My Lectures")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Import(ImportError::HandleStore { .. })
        ));
        assert!(library.channels().is_empty());
    }

    #[tokio::test]
    async fn test_relink_preserves_progress() {
        let store = Arc::new(MemoryHandleStore::new());
        let mut library = library_with(store.clone(), mock_fs());
        let id = library
            .import_folder(&picker(Some("/media/My Lectures")))
            .await
            .unwrap()
            .id
            .clone();
        library.record_progress("Week 1/1.mp4", 30.0, 60.0).unwrap();

        let channel = library
            .relink_channel(&id, &picker(Some("/media/Moved")))
            .await
            .unwrap();

        assert_eq!(channel.id, id);
        assert_eq!(channel.display_name, "My Lectures");
        assert_eq!(channel.video_count(), 2);
        assert_eq!(
            channel.find_video("Week 1/1.mp4").unwrap().playback,
            PlaybackState::InProgress {
                current_time: 30.0,
                duration: 60.0
            }
        );
        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.path(), std::path::Path::new("/media/Moved"));
    }

    #[tokio::test]
    async fn test_relink_unknown_channel() {
        let mut library = library_with(Arc::new(MemoryHandleStore::new()), mock_fs());
        let mut never = MockDirectoryPicker::new();
        never.expect_pick().never();
        let err = library.relink_channel("nope", &never).await.unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_channel_clears_selection_and_handle() {
        let store = Arc::new(MemoryHandleStore::new());
        let mut library = library_with(store.clone(), mock_fs());
        let id = library
            .import_folder(&picker(Some("/media/My Lectures")))
            .await
            .unwrap()
            .id
            .clone();
        library
            .select(Selection::channel(&id).with_playlist("Week 1"))
            .unwrap();

        let removed = library.remove_channel(&id).await.unwrap();
        assert_eq!(removed.id, id);
        assert!(library.channels().is_empty());
        assert!(library.selection().is_empty());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_reresolves_selection() {
        let fs = mock_fs();
        let mut library = library_with(Arc::new(MemoryHandleStore::new()), fs.clone());
        let id = library
            .import_folder(&picker(Some("/media/My Lectures")))
            .await
            .unwrap()
            .id
            .clone();
        library.record_progress("Week 1/2.mp4", 10.0, 100.0);
        library
            .select(
                Selection::channel(&id)
                    .with_playlist("Week 1")
                    .with_video("Week 1/2.mp4"),
            )
            .unwrap();

        fs.add_file("/media/My Lectures/Week 1/3.mp4", 10);
        let outcome = library.sync(None::<fn(&SyncProgress)>).await;
        assert_eq!(outcome.refreshed_count(), 1);

        let active = library.active();
        assert_eq!(active.playlist.unwrap().video_count, 3);
        assert_eq!(active.video.unwrap().current_time(), Some(10.0));
    }

    #[tokio::test]
    async fn test_select_unknown_channel() {
        let mut library = library_with(Arc::new(MemoryHandleStore::new()), mock_fs());
        assert!(matches!(
            library.select(Selection::channel("missing")),
            Err(Error::ChannelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_record_progress_threshold() {
        let mut library = library_with(Arc::new(MemoryHandleStore::new()), mock_fs())
            .with_watched_threshold(0.5);
        library
            .import_folder(&picker(Some("/media/My Lectures")))
            .await
            .unwrap();

        assert!(library.record_progress("intro.mp4", 60.0, 100.0).unwrap().is_watched());
        assert!(library.record_progress("missing.mp4", 1.0, 2.0).is_none());
    }

    #[test]
    fn test_from_snapshot_drops_stale_selection() {
        let snapshot = LibrarySnapshot::new(Vec::new(), Selection::channel("gone"));
        let library = Library::from_snapshot(
            snapshot,
            SyncOrchestrator::new(
                Arc::new(MemoryHandleStore::new()),
                Arc::new(MockPermissionGate::new()),
                Arc::new(MockFileSystem::new()),
            ),
        );
        assert!(library.selection().is_empty());
        assert_eq!(library.snapshot().channels.len(), 0);
    }
}
