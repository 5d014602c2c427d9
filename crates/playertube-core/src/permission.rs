//! Read-access authorization for channel directories.

use std::fmt;
use std::io::ErrorKind;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::fs::DirectoryHandle;

/// Outcome of a permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Read access is available.
    Granted,
    /// Read access was refused.
    Denied,
    /// Access may be granted after asking the user.
    Prompt,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// Authorization mechanism guarding read access to a directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Report the current read permission without asking the user.
    async fn query(&self, handle: &DirectoryHandle) -> Result<PermissionState>;

    /// Ask for read permission.
    ///
    /// Callers treat an error the same as [`PermissionState::Denied`].
    async fn request(&self, handle: &DirectoryHandle) -> Result<PermissionState>;
}

/// Permission gate backed by the operating system's own access checks.
///
/// A directory that can be listed is granted, one refused by the OS is
/// denied, and one that does not exist right now (an unplugged drive) is
/// reported as [`PermissionState::Prompt`] so that a request re-checks it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPermissionGate;

impl FsPermissionGate {
    /// Create a new gate.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn check(handle: &DirectoryHandle) -> PermissionState {
        match tokio::fs::read_dir(handle.path()).await {
            Ok(_) => PermissionState::Granted,
            Err(e) if e.kind() == ErrorKind::NotFound => PermissionState::Prompt,
            Err(e) => {
                debug!("Read access to {} refused: {}", handle.path().display(), e);
                PermissionState::Denied
            }
        }
    }
}

#[async_trait]
impl PermissionGate for FsPermissionGate {
    async fn query(&self, handle: &DirectoryHandle) -> Result<PermissionState> {
        Ok(Self::check(handle).await)
    }

    async fn request(&self, handle: &DirectoryHandle) -> Result<PermissionState> {
        // No interactive grant exists here; a second look is all a request can do.
        match Self::check(handle).await {
            PermissionState::Granted => Ok(PermissionState::Granted),
            PermissionState::Denied | PermissionState::Prompt => Ok(PermissionState::Denied),
        }
    }
}
