//! Durable persistence for the session snapshot.
//!
//! The snapshot is one JSON document holding both the user record and the
//! bearer token, so a session mutation is a single durable update. It is a
//! cache of the in-memory session: always written after the in-memory value,
//! read only at boot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use clubgate_protocol::UserRecord;

use crate::error::StorageError;

/// Snapshot file name under the storage directory.
const SNAPSHOT_FILE: &str = "session.json";

/// Durable form of the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current identity, when logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
    /// Bearer token, when logged in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// When this snapshot was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Empty (anonymous) snapshot.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Storage seam for the session snapshot.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read the snapshot. A missing snapshot is an empty one; a snapshot
    /// that exists but cannot be parsed is [`StorageError::Corrupt`].
    async fn load(&self) -> Result<SessionSnapshot, StorageError>;

    /// Persist the snapshot, replacing any previous one atomically.
    async fn store(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError>;

    /// Remove the snapshot. Idempotent.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// JSON-file-backed storage.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`; the directory is created on first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SNAPSHOT_FILE),
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self) -> Result<SessionSnapshot, StorageError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionSnapshot::empty());
            }
            Err(err) => return Err(err.into()),
        };

        serde_json::from_slice(&raw).map_err(|err| StorageError::Corrupt(err.to_string()))
    }

    async fn store(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;

        // Write-then-rename so a crash never leaves a torn snapshot.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("session snapshot written to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory storage for tests and simulated restarts.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Option<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw bytes, bypassing serialization. Used to simulate a corrupt
    /// snapshot left by an older process.
    pub async fn seed_raw(&self, raw: Vec<u8>) {
        *self.inner.lock().await = Some(raw);
    }

    /// Whether anything is currently stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<SessionSnapshot, StorageError> {
        match self.inner.lock().await.as_ref() {
            None => Ok(SessionSnapshot::empty()),
            Some(raw) => {
                serde_json::from_slice(raw).map_err(|err| StorageError::Corrupt(err.to_string()))
            }
        }
    }

    async fn store(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let body = serde_json::to_vec(snapshot)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        *self.inner.lock().await = Some(body);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
