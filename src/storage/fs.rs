use crate::storage::traits::{ImageSink, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes each image as `<directory>/<name>.<extension>`
#[derive(Debug, Clone)]
pub struct FsImageSink {
    directory: PathBuf,
    extension: String,
}

impl FsImageSink {
    /// Creates a sink rooted at `directory`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the path an image with this name is written to
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", name, self.extension))
    }
}

#[async_trait]
impl ImageSink for FsImageSink {
    async fn write(&self, name: &str, data: &[u8]) -> StorageResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| StorageError::Create {
                path: self.directory.clone(),
                source,
            })?;

        let path = self.path_for(name);
        tracing::debug!("{} being created", path.display());

        tokio::fs::write(&path, data)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}
