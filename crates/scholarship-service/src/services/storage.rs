//! Document storage backends.
//!
//! Metadata lives in Postgres; bytes live behind [`FileStore`]. Keys are
//! relative, slash-separated paths such as
//! `periods/{period}/students/{student}/{file_id}.pdf`.

use crate::errors::ScError;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Build the storage key for an uploaded document.
pub fn document_key(period_id: Uuid, student_id: Uuid, file_id: Uuid, extension: &str) -> String {
    format!("periods/{period_id}/students/{student_id}/{file_id}.{extension}")
}

/// Reject keys that could escape the storage root.
fn validate_key(key: &str) -> Result<(), ScError> {
    if key.is_empty() || key.contains('\\') {
        return Err(ScError::Storage(format!("Invalid storage key: {key:?}")));
    }
    let path = Path::new(key);
    if path.is_absolute() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(ScError::Storage(format!("Invalid storage key: {key:?}")));
    }
    Ok(())
}

/// Byte storage for uploaded documents (enables mocking).
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Store bytes under `key`, replacing any previous content.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ScError>;

    /// Read the bytes stored under `key`. Missing keys are `NotFound`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ScError>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), ScError>;
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Stores documents under a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ScError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait::async_trait]
impl FileStore for LocalFileStore {
    #[instrument(skip_all, name = "sc.storage.put", fields(size = bytes.len()))]
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ScError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ScError::Storage(format!("write {}: {e}", path.display())))
    }

    #[instrument(skip_all, name = "sc.storage.get")]
    async fn get(&self, key: &str) -> Result<Vec<u8>, ScError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ScError::NotFound("File content not found".to_string()))
            }
            Err(e) => Err(ScError::Storage(format!("read {}: {e}", path.display()))),
        }
    }

    #[instrument(skip_all, name = "sc.storage.delete")]
    async fn delete(&self, key: &str) -> Result<(), ScError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScError::Storage(format!("delete {}: {e}", path.display()))),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory store for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }
}

#[async_trait::async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ScError> {
        validate_key(key)?;
        self.objects
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ScError> {
        validate_key(key)?;
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| ScError::NotFound("File content not found".to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ScError> {
        validate_key(key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }
}
