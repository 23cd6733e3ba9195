//! Publishing transcoded clips.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use yshort_models::{sanitize_title, truncate_title};
use yshort_storage::{ObjectStore, StorageResult};

/// Characters of the title kept in the output key.
const KEY_TITLE_CHARS: usize = 50;

pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    output_prefix: String,
    url_ttl: Duration,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>, output_prefix: impl Into<String>, url_ttl: Duration) -> Self {
        Self {
            store,
            output_prefix: output_prefix.into(),
            url_ttl,
        }
    }

    /// Key for a clip titled `title` published at `unix_millis`.
    pub fn output_key(&self, title: &str, unix_millis: i64) -> String {
        format!(
            "{}/{}-{}.mp4",
            self.output_prefix,
            unix_millis,
            truncate_title(&sanitize_title(title), KEY_TITLE_CHARS)
        )
    }

    /// Upload the clip and return a signed download URL.
    ///
    /// An uploaded clip whose URL cannot be signed is deleted again.
    pub async fn publish(&self, local_path: &Path, title: &str) -> StorageResult<String> {
        let key = self.output_key(title, chrono::Utc::now().timestamp_millis());
        self.store.put_file(local_path, &key, "video/mp4").await?;

        let url = match self.store.signed_read_url(&key, self.url_ttl).await {
            Ok(url) => url,
            Err(e) => {
                if let Err(delete_err) = self.store.delete(&key).await {
                    warn!("Failed to remove unsigned clip {}: {}", key, delete_err);
                }
                return Err(e);
            }
        };

        info!("Published clip {}", key);
        Ok(url)
    }

    /// Delete a staged input. Failures are logged and otherwise ignored.
    pub async fn purge_stored_input(&self, handle: &str) {
        let result = match self.store.resolve_key(handle) {
            Ok(key) => self.store.delete(&key).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => info!("Purged stored input {}", handle),
            Err(e) => warn!("Failed to purge stored input {}: {}", handle, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yshort_storage::MemoryStore;

    fn publisher(store: Arc<MemoryStore>) -> Publisher {
        Publisher::new(store, "shorts", Duration::from_secs(86400))
    }

    #[test]
    fn test_output_key_truncates_sanitized_title() {
        let p = publisher(Arc::new(MemoryStore::new("b")));
        assert_eq!(p.output_key("My:Clip", 1700000000000), "shorts/1700000000000-MyClip.mp4");

        let long = "a".repeat(80);
        let key = p.output_key(&long, 1);
        assert_eq!(key, format!("shorts/1-{}.mp4", "a".repeat(50)));
    }

    #[tokio::test]
    async fn test_publish_uploads_mp4_and_signs() {
        let dir = TempDir::new().unwrap();
        let clip = dir.path().join("short.mp4");
        tokio::fs::write(&clip, b"clip").await.unwrap();

        let store = Arc::new(MemoryStore::new("b"));
        let url = publisher(store.clone()).publish(&clip, "Title").await.unwrap();

        let keys = store.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("shorts/") && keys[0].ends_with("-Title.mp4"));
        assert_eq!(store.content_type(&keys[0]).as_deref(), Some("video/mp4"));
        assert_eq!(url, format!("memory://b/{}?expires=86400", keys[0]));
    }

    #[tokio::test]
    async fn test_signing_failure_removes_upload() {
        let dir = TempDir::new().unwrap();
        let clip = dir.path().join("short.mp4");
        tokio::fs::write(&clip, b"clip").await.unwrap();

        let store = Arc::new(MemoryStore::new("b"));
        store.fail_signing(true);
        let err = publisher(store.clone()).publish(&clip, "Title").await.unwrap_err();

        assert_eq!(err.to_string(), "Presign failed: injected signing failure");
        assert!(store.keys().is_empty());
        assert_eq!(store.deleted_keys().len(), 1);
        assert!(store.deleted_keys()[0].starts_with("shorts/"));

        // A failed cleanup still reports the signing error
        store.fail_deletes(true);
        let err = publisher(store.clone()).publish(&clip, "Title").await.unwrap_err();
        assert!(matches!(err, yshort_storage::StorageError::PresignFailed(_)));
    }

    #[tokio::test]
    async fn test_purge_swallows_failures() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("input/x.mp4", b"x".to_vec());
        store.fail_deletes(true);

        let p = publisher(store.clone());
        p.purge_stored_input("gs://b/input/x.mp4").await;
        assert!(store.contains("input/x.mp4"));

        store.fail_deletes(false);
        p.purge_stored_input("gs://b/input/x.mp4").await;
        assert!(!store.contains("input/x.mp4"));

        // Malformed handles are only logged
        p.purge_stored_input("gs://").await;
    }
}
