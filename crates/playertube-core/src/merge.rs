//! Reconciling a rescanned catalog with stored playback progress.
//!
//! Identity is the video's path relative to the channel root. A file that
//! was renamed or moved is a new video and starts unplayed; no content
//! hashing is done to follow it.

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::{PlaybackState, Playlist};

/// Merge a freshly assembled catalog with the previous one.
///
/// The structure (membership, order, indices, titles, sizes) comes from
/// `fresh`. Playback state is copied from `previous` for every video whose
/// id is present in both. Videos only in `previous` are dropped.
#[must_use]
pub fn merge_playlists(fresh: Vec<Playlist>, previous: &[Playlist]) -> Vec<Playlist> {
    let prior: HashMap<&str, PlaybackState> = previous
        .iter()
        .flat_map(|p| p.videos.iter())
        .map(|v| (v.id.as_str(), v.playback))
        .collect();

    let mut carried = 0usize;
    let merged: Vec<Playlist> = fresh
        .into_iter()
        .map(|mut playlist| {
            for video in &mut playlist.videos {
                video.playback = match prior.get(video.id.as_str()) {
                    Some(state) => {
                        carried += 1;
                        *state
                    }
                    None => PlaybackState::NotStarted,
                };
            }
            playlist
        })
        .collect();

    debug!(
        "Merged catalog: {} of {} previous video(s) carried over",
        carried,
        prior.len()
    );
    merged
}
