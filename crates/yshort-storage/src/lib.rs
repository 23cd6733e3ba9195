//! Object storage for clip inputs and outputs.
//!
//! This crate provides:
//! - The [`ObjectStore`] capability used by the pipeline
//! - Parsing of storage handles (`gs://bucket/key`, `s3://bucket/key`, bare keys)
//! - An S3-compatible implementation and an in-memory one

pub mod error;
pub mod handle;
pub mod memory;
pub mod s3;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use handle::ObjectHandle;
pub use memory::MemoryStore;
pub use s3::{S3Store, StorageConfig};
pub use store::{connect_from_env, ObjectStore, StorageBackend};
