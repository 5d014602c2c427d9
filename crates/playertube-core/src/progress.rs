//! Recording playback progress reported by the player.

use tracing::{debug, warn};

use crate::catalog::{Channel, PlaybackState};

/// Fraction of a video that must be played for it to count as watched.
pub const WATCHED_THRESHOLD: f64 = 0.98;

/// Set the playback position of a video using [`WATCHED_THRESHOLD`].
///
/// See [`record_progress_with_threshold`].
#[must_use]
pub fn record_progress(
    channels: &[Channel],
    video_id: &str,
    current_time: f64,
    duration: f64,
) -> Vec<Channel> {
    record_progress_with_threshold(channels, video_id, current_time, duration, WATCHED_THRESHOLD)
}

/// Set the playback position of a video.
///
/// Every video whose id matches, in any channel and playlist, gets the new
/// position and duration. It becomes watched once `current_time / duration`
/// exceeds `threshold`, and a watched video stays watched when re-played
/// from the start. A non-positive duration never marks a video watched.
///
/// Reports with a NaN or infinite position or duration (a player that has
/// not loaded metadata yet) are ignored and the collection is returned
/// unchanged.
#[must_use]
pub fn record_progress_with_threshold(
    channels: &[Channel],
    video_id: &str,
    current_time: f64,
    duration: f64,
    threshold: f64,
) -> Vec<Channel> {
    if !current_time.is_finite() || !duration.is_finite() {
        warn!(
            "Ignoring progress {}/{} for {}: not a finite position",
            current_time, duration, video_id
        );
        return channels.to_vec();
    }
    let finished = duration > 0.0 && current_time / duration > threshold;

    let mut updated = channels.to_vec();
    let mut matched = 0usize;
    for video in updated
        .iter_mut()
        .flat_map(|c| c.playlists.iter_mut())
        .flat_map(|p| p.videos.iter_mut())
        .filter(|v| v.id == video_id)
    {
        matched += 1;
        video.playback = if finished || video.playback.is_watched() {
            PlaybackState::Watched {
                current_time,
                duration,
            }
        } else {
            PlaybackState::InProgress {
                current_time,
                duration,
            }
        };
    }

    debug!(
        "Recorded progress {:.1}/{:.1}s for {} ({} match(es))",
        current_time, duration, video_id, matched
    );
    updated
}
