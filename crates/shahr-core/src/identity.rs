//! Persistence of the logged-in identity across restarts.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ShahrError};
use crate::types::User;

/// File name used inside the data directory.
pub const IDENTITY_FILE_NAME: &str = "identity.json";

/// What gets remembered about the last login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedIdentity {
    /// Bearer token handed out at login.
    pub token: String,
    pub user: User,
}

/// Key-value style save/restore of a single identity record.
pub trait IdentityStore: Send + Sync {
    fn save(&self, identity: &SavedIdentity) -> Result<()>;
    /// `Ok(None)` when nothing has been saved.
    fn restore(&self) -> Result<Option<SavedIdentity>>;
    fn clear(&self) -> Result<()>;
}

/// Stores the identity as JSON in a single file.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/identity.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(IDENTITY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn save(&self, identity: &SavedIdentity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(identity)?;
        std::fs::write(&self.path, json)?;
        info!(path = %self.path.display(), "Identity saved");
        Ok(())
    }

    fn restore(&self) -> Result<Option<SavedIdentity>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved identity");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let identity = serde_json::from_str(&content).map_err(|e| {
            ShahrError::Identity(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Some(identity))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Identity cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<SavedIdentity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn save(&self, identity: &SavedIdentity) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| ShahrError::Identity(format!("Lock poisoned: {}", e)))?;
        *slot = Some(identity.clone());
        Ok(())
    }

    fn restore(&self) -> Result<Option<SavedIdentity>> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| ShahrError::Identity(format!("Lock poisoned: {}", e)))?;
        Ok(slot.clone())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| ShahrError::Identity(format!("Lock poisoned: {}", e)))?;
        *slot = None;
        Ok(())
    }
}
