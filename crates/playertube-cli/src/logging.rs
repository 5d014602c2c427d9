//! Log setup for the `playertube` binary.
//!
//! Human-readable events go to stderr so stdout only carries command
//! output. A daily JSON log is kept under the data directory for
//! troubleshooting sync and import runs after the fact.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "playertube.log";

/// Where logs go and how much of our own crates' output to keep.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log.
    pub log_directory: PathBuf,
    /// Level for `playertube` crates on stderr.
    pub console_level: Level,
    /// Level for `playertube` crates in the log file.
    pub file_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: default_log_directory(),
            console_level: Level::WARN,
            file_level: Level::INFO,
        }
    }
}

impl LoggingConfig {
    /// Debug builds log more to the file; the console stays quiet either way.
    #[must_use]
    pub fn auto() -> Self {
        let config = Self::default();
        if cfg!(debug_assertions) {
            Self {
                file_level: Level::DEBUG,
                ..config
            }
        } else {
            config
        }
    }

    /// Set the console level, e.g. for `--verbose`.
    #[must_use]
    pub const fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    /// Console filter used when `RUST_LOG` is not set.
    #[must_use]
    pub fn console_directives(&self) -> String {
        crate_directives(self.console_level)
    }

    /// File filter.
    #[must_use]
    pub fn file_directives(&self) -> String {
        crate_directives(self.file_level)
    }
}

/// Keeps the file writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(&config.log_directory).map_err(|e| {
        LoggingError::DirectoryCreationFailed {
            path: config.log_directory.clone(),
            reason: e.to_string(),
        }
    })?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(rolling::daily(
        &config.log_directory,
        LOG_FILE_PREFIX,
    ));

    // RUST_LOG only overrides the console.
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_directives()));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_filter(EnvFilter::new(config.file_directives()));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// `<data_local_dir>/playertube/logs`.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playertube")
        .join("logs")
}

/// Dependencies stay at `warn`; our crates log at `level`.
fn crate_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("warn,playertube={level},playertube_core={level}")
}

/// Errors from [`init`].
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreationFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A global subscriber was already set.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
