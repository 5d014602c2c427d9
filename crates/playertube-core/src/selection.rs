//! What the user is currently looking at, kept as ids.
//!
//! Selections hold ids rather than references so they survive a sync that
//! replaces the whole collection; [`Selection::resolve`] looks them up in
//! the current channels on demand.

use serde::{Deserialize, Serialize};

use crate::catalog::{Channel, Playlist, Video};

/// Active channel, playlist and video ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selection {
    /// Active channel id.
    pub channel_id: Option<String>,
    /// Active playlist id within the channel.
    pub playlist_id: Option<String>,
    /// Active video id within the playlist.
    pub video_id: Option<String>,
}

/// A selection looked up against a channel collection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolvedSelection<'a> {
    /// Active channel, if it still exists.
    pub channel: Option<&'a Channel>,
    /// Active playlist, if it still exists in the active channel.
    pub playlist: Option<&'a Playlist>,
    /// Active video, if it still exists in the active playlist.
    pub video: Option<&'a Video>,
}

impl Selection {
    /// Select a channel, clearing playlist and video.
    pub fn channel(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            ..Self::default()
        }
    }

    /// Narrow to a playlist, clearing the video.
    #[must_use]
    pub fn with_playlist(mut self, playlist_id: impl Into<String>) -> Self {
        self.playlist_id = Some(playlist_id.into());
        self.video_id = None;
        self
    }

    /// Narrow to a video.
    #[must_use]
    pub fn with_video(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    /// Whether nothing is selected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.channel_id.is_none() && self.playlist_id.is_none() && self.video_id.is_none()
    }

    /// Look up the selection in `channels`.
    ///
    /// Each level is searched inside the level above it, so a playlist is
    /// only found if its channel is.
    #[must_use]
    pub fn resolve<'a>(&self, channels: &'a [Channel]) -> ResolvedSelection<'a> {
        let channel = self
            .channel_id
            .as_deref()
            .and_then(|id| channels.iter().find(|c| c.id == id));
        let playlist = channel
            .zip(self.playlist_id.as_deref())
            .and_then(|(c, id)| c.find_playlist(id));
        let video = playlist
            .zip(self.video_id.as_deref())
            .and_then(|(p, id)| p.find_video(id));
        ResolvedSelection {
            channel,
            playlist,
            video,
        }
    }

    /// Drop ids that no longer resolve after a sync or removal.
    #[must_use]
    pub fn retain_valid(&self, channels: &[Channel]) -> Self {
        let resolved = self.resolve(channels);
        Self {
            channel_id: resolved.channel.map(|c| c.id.clone()),
            playlist_id: resolved.playlist.map(|p| p.id.clone()),
            video_id: resolved.video.map(|v| v.id.clone()),
        }
    }
}
