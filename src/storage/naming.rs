//! Image file naming
//!
//! Names come from the final path segment of the fetched image URL, cut at
//! the first `.`, and are bounded in length for filesystem limits. Distinct
//! images that land on the same name are told apart by a digest of their URL.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use url::Url;

/// Digest lengths tried, in order, when a name is held by another URL
const DIGEST_LENGTHS: [usize; 3] = [8, 16, 64];

/// Outcome of naming one fetched image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetName {
    /// Persist the image under this name
    Keep(String),
    /// Color swatch thumbnail, not a product photo
    Swatch(String),
    /// The URL has no usable path segment
    Unnamed,
}

/// Turns fetched image URLs into bounded, filtered file names
#[derive(Debug, Clone)]
pub struct AssetNamer {
    swatch_marker: String,
    max_len: usize,
}

impl AssetNamer {
    pub fn new(swatch_marker: impl Into<String>, max_len: usize) -> Self {
        Self {
            swatch_marker: swatch_marker.into(),
            max_len,
        }
    }

    /// Names the image fetched from `url`
    ///
    /// The swatch check runs on the full derived name, before truncation.
    pub fn name_for(&self, url: &str) -> AssetName {
        let Some(stem) = derive_image_name(url) else {
            return AssetName::Unnamed;
        };

        if stem.contains(&self.swatch_marker) {
            return AssetName::Swatch(stem);
        }

        AssetName::Keep(truncate_name(&stem, self.max_len))
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

/// Result of claiming a file name for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameClaim {
    /// Nobody held this name; write the image under it
    Fresh(String),
    /// The same image URL already holds this name
    Repeat(String),
}

/// File names handed out during one harvest, each bound to the image URL
/// that claimed it
#[derive(Debug)]
pub struct NameRegistry {
    max_len: usize,
    claimed: Mutex<HashMap<String, String>>,
}

impl NameRegistry {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            claimed: Mutex::new(HashMap::new()),
        }
    }

    /// Claims `name` for the image at `url`
    ///
    /// When another URL already holds `name`, a short SHA-256 digest of `url`
    /// is appended, with the name cut back so the result stays within the
    /// length bound. The same URL always maps to the same name.
    pub fn claim(&self, name: &str, url: &str) -> NameClaim {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);

        let candidates = std::iter::once(name.to_string()).chain(
            DIGEST_LENGTHS
                .iter()
                .map(|len| disambiguate(name, url, *len, self.max_len)),
        );

        let mut last = name.to_string();
        for candidate in candidates {
            match claimed.get(&candidate) {
                None => {
                    claimed.insert(candidate.clone(), url.to_string());
                    return NameClaim::Fresh(candidate);
                }
                Some(owner) if owner == url => return NameClaim::Repeat(candidate),
                Some(_) => last = candidate,
            }
        }

        // Every candidate belongs to another URL; only possible with a tiny length bound
        tracing::warn!("No free name for {}, overwriting {}", url, last);
        claimed.insert(last.clone(), url.to_string());
        NameClaim::Fresh(last)
    }

    /// Gives back a name whose write failed, so a later copy of `url` is written again
    pub fn release(&self, name: &str, url: &str) {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if claimed.get(name).map(String::as_str) == Some(url) {
            claimed.remove(name);
        }
    }
}

fn disambiguate(name: &str, url: &str, digest_len: usize, max_len: usize) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let digest = &digest[..digest_len.min(digest.len())];

    let keep = max_len.saturating_sub(digest.len() + 1);
    if keep == 0 {
        truncate_name(digest, max_len)
    } else {
        format!("{}_{}", truncate_name(name, keep), digest)
    }
}

/// Derives the base name of the resource at `url`
///
/// # Examples
///
/// ```
/// use catalog_ripper::storage::derive_image_name;
///
/// assert_eq!(
///     derive_image_name("https://images.example.com/is/image/12345_fpx.tif?wid=1200").as_deref(),
///     Some("12345_fpx")
/// );
/// assert_eq!(derive_image_name("https://images.example.com/"), None);
/// ```
pub fn derive_image_name(url: &str) -> Option<String> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').find(|s| !s.is_empty()))
            .map(str::to_string),
    }?;

    let stem = segment.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Truncates `name` to at most `max_len` characters
pub fn truncate_name(name: &str, max_len: usize) -> String {
    name.chars().take(max_len).collect()
}
