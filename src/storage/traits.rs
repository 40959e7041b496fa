//! Storage traits and error types
//!
//! This module defines the trait interface for image sinks and
//! associated error types.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting an image
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid image name: {0:?}")]
    InvalidName(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for harvested images
///
/// Implementations must accept concurrent writes of distinct names.
/// Writing a name that already exists replaces it; avoiding collisions
/// is the caller's job.
#[async_trait]
pub trait ImageSink: Send + Sync {
    /// Persists `data` under `name` and returns where it landed
    async fn write(&self, name: &str, data: &[u8]) -> StorageResult<PathBuf>;
}
