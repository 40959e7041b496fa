//! On-disk response cache
//!
//! Each successful response is stored in one file named by the SHA-256 of
//! the requested URL. The file holds the final URL on its first line and the
//! raw body after it.

use crate::crawler::fetcher::FetchedPage;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ResponseCache {
    directory: PathBuf,
}

impl ResponseCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        self.directory.join(hex::encode(hasher.finalize()))
    }

    /// Returns the cached response for `url`, if any
    pub async fn load(&self, url: &str) -> Option<FetchedPage> {
        let raw = tokio::fs::read(self.path_for(url)).await.ok()?;
        let split = raw.iter().position(|b| *b == b'\n')?;
        let final_url = std::str::from_utf8(&raw[..split]).ok()?.to_string();

        Some(FetchedPage {
            url: final_url,
            status: 200,
            body: raw[split + 1..].to_vec(),
            from_cache: true,
        })
    }

    /// Stores a response; failures are logged and otherwise ignored
    pub async fn store(&self, url: &str, page: &FetchedPage) {
        if let Err(e) = tokio::fs::create_dir_all(&self.directory).await {
            tracing::warn!(
                "Could not create cache dir {}: {}",
                self.directory.display(),
                e
            );
            return;
        }

        let mut raw = Vec::with_capacity(page.url.len() + 1 + page.body.len());
        raw.extend_from_slice(page.url.as_bytes());
        raw.push(b'\n');
        raw.extend_from_slice(&page.body);

        let path = self.path_for(url);
        if let Err(e) = tokio::fs::write(&path, raw).await {
            tracing::warn!("Could not cache {} at {}: {}", url, path.display(), e);
        }
    }
}
