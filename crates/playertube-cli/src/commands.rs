//! Command implementations for the `playertube` binary.
//!
//! Every command runs against a [`Library`] restored from the snapshot and
//! handle store named in the configuration. Commands that change the
//! library save the snapshot afterwards; failed commands leave it alone.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::Subcommand;
use playertube_core::{
    AppConfig, Channel, DirectoryHandle, DirectoryPicker, FsPermissionGate, JsonHandleStore,
    Library, LibrarySnapshot, Playlist, RealFileSystem, Selection, SyncOptions, SyncOrchestrator,
    SyncProgress, Video,
};
use tracing::{debug, info};

/// Library commands.
#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Import a folder as a new channel
    Import {
        /// Folder to import
        dir: PathBuf,
    },

    /// Rescan every channel, keeping playback progress
    Sync,

    /// List channels, or the playlists of one channel
    List {
        /// Channel to show in detail
        #[arg(short, long)]
        channel: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Point a channel at a folder that was moved
    Relink {
        /// Channel id
        channel_id: String,
        /// New location of the folder
        dir: PathBuf,
    },

    /// Remove a channel from the library
    Remove {
        /// Channel id
        channel_id: String,
    },

    /// Record how far a video has been played
    Progress {
        /// Video id (its path inside the channel folder)
        video_id: String,
        /// Position in seconds
        #[arg(value_parser = parse_seconds)]
        current: f64,
        /// Length of the video in seconds
        #[arg(value_parser = parse_seconds)]
        duration: f64,
    },

    /// Choose the active channel, playlist and video
    Select {
        /// Channel id
        channel_id: String,
        /// Playlist id
        playlist_id: Option<String>,
        /// Video id
        video_id: Option<String>,
    },
}

impl Command {
    /// Whether a successful run changes the library.
    pub const fn mutates(&self) -> bool {
        !matches!(self, Self::List { .. })
    }
}

/// Picker for a directory given on the command line.
#[derive(Debug, Clone)]
pub struct PathPicker {
    path: PathBuf,
}

impl PathPicker {
    /// Create a picker that always picks `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DirectoryPicker for PathPicker {
    async fn pick(&self) -> playertube_core::Result<Option<DirectoryHandle>> {
        // Canonical paths give `.` and `..` a real folder name.
        let path = tokio::fs::canonicalize(&self.path)
            .await
            .unwrap_or_else(|_| self.path.clone());
        Ok(Some(DirectoryHandle::new(path)))
    }
}

/// Build the library described by `config`.
///
/// # Errors
///
/// Returns an error if the snapshot exists but cannot be read.
pub fn open_library(config: &AppConfig) -> anyhow::Result<Library> {
    let snapshot = LibrarySnapshot::load(&config.library_file).with_context(|| {
        format!("Failed to load library from {}", config.library_file.display())
    })?;

    let orchestrator = SyncOrchestrator::new(
        Arc::new(JsonHandleStore::new(&config.handles_file)),
        Arc::new(FsPermissionGate::new()),
        Arc::new(RealFileSystem::new()),
    )
    .with_options(SyncOptions::default().with_scan_options(config.scan_options()));

    Ok(Library::from_snapshot(snapshot, orchestrator)
        .with_watched_threshold(config.watched_threshold))
}

/// Run a command and save the library if it changed.
///
/// # Errors
///
/// Returns an error if the command fails or the snapshot cannot be saved.
pub async fn run(command: Command, config: &AppConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let mut library = open_library(config)?;
    let mutates = command.mutates();

    execute(&mut library, command, out).await?;

    if mutates {
        library
            .snapshot()
            .save(&config.library_file)
            .with_context(|| format!("Failed to save {}", config.library_file.display()))?;
        debug!("Library saved to {}", config.library_file.display());
    }
    Ok(())
}

/// Apply a command to `library`, writing results to `out`.
///
/// # Errors
///
/// Returns an error if the command is rejected.
pub async fn execute(
    library: &mut Library,
    command: Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Import { dir } => {
            let channel = library
                .import_folder(&PathPicker::new(&dir))
                .await
                .with_context(|| format!("Could not import {}", dir.display()))?;
            writeln!(
                out,
                "Imported {} as {} ({} playlists, {} videos)",
                channel.display_name,
                channel.id,
                channel.playlists.len(),
                channel.video_count()
            )?;
        }

        Command::Sync => {
            let token = library.orchestrator().cancellation_token();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, finishing current channel");
                    token.store(true, Ordering::SeqCst);
                }
            });

            let outcome = library
                .sync(Some(|p: &SyncProgress| {
                    debug!("[{}/{}] {}", p.current, p.total, p.channel_name);
                }))
                .await;
            interrupt.abort();

            for report in &outcome.reports {
                writeln!(out, "{}: {}", report.channel_id, report.status)?;
            }
            writeln!(out, "{}", outcome.summary())?;
        }

        Command::List { channel, json } => match channel {
            Some(id) => {
                let channel = library
                    .channel(&id)
                    .with_context(|| format!("Unknown channel {id}"))?;
                if json {
                    serde_json::to_writer_pretty(&mut *out, channel)?;
                    writeln!(out)?;
                } else {
                    write_channel_detail(out, channel, library.selection())?;
                }
            }
            None if json => {
                serde_json::to_writer_pretty(&mut *out, library.channels())?;
                writeln!(out)?;
            }
            None => {
                if library.channels().is_empty() {
                    writeln!(out, "No channels yet. Add one with: playertube import <DIR>")?;
                }
                for channel in library.channels() {
                    let active =
                        library.selection().channel_id.as_deref() == Some(channel.id.as_str());
                    writeln!(
                        out,
                        "{} {}  {} {}  {} playlists, {} videos",
                        if active { "*" } else { " " },
                        channel.id,
                        channel.display_name,
                        channel.handle,
                        channel.playlists.len(),
                        channel.video_count()
                    )?;
                }
            }
        },

        Command::Relink { channel_id, dir } => {
            let channel = library
                .relink_channel(&channel_id, &PathPicker::new(&dir))
                .await
                .with_context(|| format!("Could not re-link {channel_id}"))?;
            writeln!(
                out,
                "Re-linked {} to {} ({} videos)",
                channel.display_name,
                dir.display(),
                channel.video_count()
            )?;
        }

        Command::Remove { channel_id } => {
            let removed = library.remove_channel(&channel_id).await?;
            writeln!(out, "Removed {}", removed.display_name)?;
        }

        Command::Progress {
            video_id,
            current,
            duration,
        } => {
            let Some(video) = library.record_progress(&video_id, current, duration) else {
                bail!("Unknown video {video_id}");
            };
            writeln!(out, "{} {}", video.title, progress_label(video))?;
        }

        Command::Select {
            channel_id,
            playlist_id,
            video_id,
        } => {
            let mut selection = Selection::channel(channel_id);
            if let Some(playlist_id) = playlist_id {
                selection = selection.with_playlist(playlist_id);
            }
            if let Some(video_id) = video_id {
                selection = selection.with_video(video_id);
            }

            let resolved = library.select(selection)?;
            let names = [
                resolved.channel.map(|c| c.display_name.as_str()),
                resolved.playlist.map(|p| p.name.as_str()),
                resolved.video.map(|v| v.title.as_str()),
            ];
            let path: Vec<&str> = names.into_iter().flatten().collect();
            writeln!(out, "Selected {}", path.join(" / "))?;
        }
    }
    Ok(())
}

fn write_channel_detail(
    out: &mut impl Write,
    channel: &Channel,
    selection: &Selection,
) -> std::io::Result<()> {
    writeln!(out, "{} ({})", channel.display_name, channel.handle)?;
    for playlist in &channel.playlists {
        write_playlist(out, playlist, selection)?;
    }
    Ok(())
}

fn write_playlist(
    out: &mut impl Write,
    playlist: &Playlist,
    selection: &Selection,
) -> std::io::Result<()> {
    writeln!(
        out,
        "\n{} [{}] {}/{} watched, {}",
        playlist.name,
        playlist.id,
        playlist.watched_count(),
        playlist.video_count,
        playlist.total_size
    )?;
    for video in &playlist.videos {
        let active = selection.video_id.as_deref() == Some(video.id.as_str());
        writeln!(
            out,
            "{} {:>3}. {} ({}) {}",
            if active { ">" } else { " " },
            video.index + 1,
            video.title,
            video.size,
            progress_label(video)
        )?;
    }
    Ok(())
}

/// Accepts only finite numbers of seconds.
fn parse_seconds(value: &str) -> std::result::Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
    if seconds.is_finite() {
        Ok(seconds)
    } else {
        Err(format!("{value} is not a finite number of seconds"))
    }
}

fn progress_label(video: &Video) -> String {
    if video.is_watched() {
        "watched".to_string()
    } else if video.current_time().is_some() {
        format!("{:.0}%", video.playback.fraction() * 100.0)
    } else {
        String::new()
    }
}
