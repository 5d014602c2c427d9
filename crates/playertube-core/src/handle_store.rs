//! Persistent storage of directory capabilities, keyed by channel id.
//!
//! Channels only carry a display label; the capability needed to read the
//! directory again after a restart lives here.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fs::DirectoryHandle;

/// Storage for directory handles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HandleStore: Send + Sync {
    /// Fetch the handle for a channel, if one was saved.
    async fn get(&self, channel_id: &str) -> Result<Option<DirectoryHandle>>;

    /// Save or replace the handle for a channel.
    async fn save(&self, channel_id: &str, handle: &DirectoryHandle) -> Result<()>;

    /// Forget the handle for a channel. Unknown ids are ignored.
    async fn delete(&self, channel_id: &str) -> Result<()>;
}

/// Process-local handle store.
#[derive(Debug, Default)]
pub struct MemoryHandleStore {
    handles: RwLock<HashMap<String, DirectoryHandle>>,
}

impl MemoryHandleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::HandleStore("handle store lock poisoned".to_string())
    }
}

#[async_trait]
impl HandleStore for MemoryHandleStore {
    async fn get(&self, channel_id: &str) -> Result<Option<DirectoryHandle>> {
        let handles = self.handles.read().map_err(|_| Self::poisoned())?;
        Ok(handles.get(channel_id).cloned())
    }

    async fn save(&self, channel_id: &str, handle: &DirectoryHandle) -> Result<()> {
        let mut handles = self.handles.write().map_err(|_| Self::poisoned())?;
        handles.insert(channel_id.to_string(), handle.clone());
        Ok(())
    }

    async fn delete(&self, channel_id: &str) -> Result<()> {
        let mut handles = self.handles.write().map_err(|_| Self::poisoned())?;
        handles.remove(channel_id);
        Ok(())
    }
}

/// Handle store persisted as a JSON map of channel id to directory path.
///
/// The whole file is rewritten on every change. A missing file reads as an
/// empty store.
#[derive(Debug, Clone)]
pub struct JsonHandleStore {
    path: PathBuf,
}

impl JsonHandleStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, PathBuf>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Handle store {} not found, starting empty", self.path.display());
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                return Err(Error::HandleStore(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::HandleStore(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    async fn write_all(&self, handles: &BTreeMap<String, PathBuf>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::HandleStore(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(handles)?;
        tokio::fs::write(&self.path, content).await.map_err(|e| {
            Error::HandleStore(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl HandleStore for JsonHandleStore {
    async fn get(&self, channel_id: &str) -> Result<Option<DirectoryHandle>> {
        let handles = self.read_all().await?;
        Ok(handles.get(channel_id).map(DirectoryHandle::new))
    }

    async fn save(&self, channel_id: &str, handle: &DirectoryHandle) -> Result<()> {
        let mut handles = self.read_all().await?;
        handles.insert(channel_id.to_string(), handle.path().to_path_buf());
        self.write_all(&handles).await?;
        info!(
            "Saved handle for channel {} -> {}",
            channel_id,
            handle.path().display()
        );
        Ok(())
    }

    async fn delete(&self, channel_id: &str) -> Result<()> {
        let mut handles = self.read_all().await?;
        if handles.remove(channel_id).is_none() {
            warn!("No handle stored for channel {}", channel_id);
            return Ok(());
        }
        self.write_all(&handles).await
    }
}
