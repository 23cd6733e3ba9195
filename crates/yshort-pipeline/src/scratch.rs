//! Per-run scratch files.
//!
//! A [`ScratchSpace`] hands out unique paths under the scratch root and
//! removes every one of them on [`ScratchSpace::cleanup`]. Files that were
//! never created are ignored; other removal failures are logged only.

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct ScratchSpace {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: Vec::new(),
        }
    }

    /// Make sure the root directory exists.
    pub async fn prepare(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Reserve a unique `<prefix>-<uuid>.<extension>` path.
    pub fn allocate(&mut self, prefix: &str, extension: &str) -> PathBuf {
        let path = self
            .root
            .join(format!("{}-{}.{}", prefix, Uuid::new_v4(), extension));
        self.paths.push(path.clone());
        path
    }

    /// Remove every allocated file.
    pub async fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed scratch file {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove scratch file {}: {}", path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cleanup_removes_allocated_files() {
        let dir = TempDir::new().unwrap();
        let mut scratch = ScratchSpace::new(dir.path().join("runs"));
        scratch.prepare().await.unwrap();

        let input = scratch.allocate("input", "mp4");
        let output = scratch.allocate("short", "mp4");
        assert_ne!(input, output);
        assert!(input.file_name().unwrap().to_string_lossy().starts_with("input-"));

        tokio::fs::write(&input, b"x").await.unwrap();
        // output is never created

        scratch.cleanup().await;
        assert!(!input.exists());
        assert!(scratch.paths.is_empty());
    }

    #[test]
    fn test_drop_removes_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = {
            let mut scratch = ScratchSpace::new(dir.path());
            let path = scratch.allocate("input", "mp4");
            std::fs::write(&path, b"x").unwrap();
            path
        };
        assert!(!path.exists());
    }
}
