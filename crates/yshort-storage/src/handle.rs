//! Storage handles.
//!
//! Callers refer to stored objects as `gs://<bucket>/<key>`,
//! `s3://<bucket>/<key>` or a bare `<key>` in the configured bucket.

use std::fmt;
use std::path::Path;

use crate::error::{StorageError, StorageResult};

const SCHEMES: [&str; 2] = ["gs://", "s3://"];

/// A parsed reference to an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    /// Bucket named by the handle, if any
    pub bucket: Option<String>,
    /// Object key within the bucket
    pub key: String,
}

impl ObjectHandle {
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let raw = raw.trim();

        for scheme in SCHEMES {
            if let Some(rest) = raw.strip_prefix(scheme) {
                let (bucket, key) = rest
                    .split_once('/')
                    .ok_or_else(|| StorageError::invalid_handle(raw))?;
                if bucket.is_empty() || key.is_empty() {
                    return Err(StorageError::invalid_handle(raw));
                }
                return Ok(Self {
                    bucket: Some(bucket.to_string()),
                    key: key.to_string(),
                });
            }
        }

        if raw.is_empty() || raw.contains("://") {
            return Err(StorageError::invalid_handle(raw));
        }

        Ok(Self {
            bucket: None,
            key: raw.trim_start_matches('/').to_string(),
        })
    }

    /// Key within `bucket`, rejecting handles that name a different bucket.
    pub fn key_in(&self, bucket: &str) -> StorageResult<&str> {
        match &self.bucket {
            Some(b) if b != bucket => Err(StorageError::invalid_handle(format!(
                "handle bucket '{}' does not match configured bucket '{}'",
                b, bucket
            ))),
            _ => Ok(&self.key),
        }
    }

    /// File stem of the key (`input/abc-1.mp4` → `abc-1`).
    pub fn file_stem(&self) -> Option<String> {
        Path::new(&self.key)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
    }

    /// `gs://bucket/key` form.
    pub fn gs_uri(bucket: &str, key: &str) -> String {
        format!("gs://{}/{}", bucket, key)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bucket {
            Some(bucket) => write!(f, "gs://{}/{}", bucket, self.key),
            None => write!(f, "{}", self.key),
        }
    }
}
