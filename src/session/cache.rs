use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::utils::{CounselError, Result};

/// Durable home for the serialized active conversation
///
/// Holds exactly one entry. Implementations must be cheap and synchronous.
pub trait MessageCache: Send + Sync {
    /// Read the stored payload, `None` when nothing has been written yet
    fn read(&self) -> Result<Option<String>>;

    /// Replace the stored payload
    fn write(&self, payload: &str) -> Result<()>;

    /// Remove the stored payload
    fn remove(&self) -> Result<()>;
}

/// Cache backed by a single JSON file
#[derive(Debug)]
pub struct FileMessageCache {
    path: PathBuf,
}

impl FileMessageCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageCache for FileMessageCache {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, payload: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves half a file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            CounselError::StorageError(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process cache. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageCache {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryMessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with an existing payload
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    pub fn snapshot(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl MessageCache for MemoryMessageCache {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn write(&self, payload: &str) -> Result<()> {
        *self.slot.lock() = Some(payload.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}
