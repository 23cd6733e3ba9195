//! The storage capability used by the pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::handle::ObjectHandle;
use crate::memory::MemoryStore;
use crate::s3::{S3Store, StorageConfig};

/// Object storage keyed by string keys within one bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket all keys live in.
    fn bucket(&self) -> &str;

    /// Upload a local file under `key`.
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()>;

    /// Download `key` into a local file, creating parent directories.
    async fn get_to_file(&self, key: &str, path: &Path) -> StorageResult<()>;

    /// Delete `key`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Time-limited read URL for `key`.
    async fn signed_read_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Verify the backend is reachable.
    async fn check_connectivity(&self) -> StorageResult<()>;

    /// Resolve a caller-supplied handle to a key in this store's bucket.
    fn resolve_key(&self, raw_handle: &str) -> StorageResult<String> {
        let handle = ObjectHandle::parse(raw_handle)?;
        Ok(handle.key_in(self.bucket())?.to_string())
    }

    /// Handle string for a key in this store.
    fn handle_for(&self, key: &str) -> String {
        ObjectHandle::gs_uri(self.bucket(), key)
    }
}

/// Which [`ObjectStore`] implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Memory,
}

impl StorageBackend {
    /// Read `STORAGE_BACKEND` (`s3` by default).
    pub fn from_env() -> StorageResult<Self> {
        match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "s3" | "gcs" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(StorageError::config_error(format!(
                "unknown STORAGE_BACKEND '{}'",
                other
            ))),
        }
    }
}

/// Build the configured store.
pub async fn connect_from_env() -> StorageResult<Arc<dyn ObjectStore>> {
    let config = StorageConfig::from_env()?;
    match StorageBackend::from_env()? {
        StorageBackend::S3 => {
            info!(bucket = %config.bucket_name, endpoint = %config.endpoint_url, "Using S3-compatible storage");
            Ok(Arc::new(S3Store::new(config).await?))
        }
        StorageBackend::Memory => {
            info!(bucket = %config.bucket_name, "Using in-memory storage");
            Ok(Arc::new(MemoryStore::new(config.bucket_name)))
        }
    }
}
