//! Storage module for persisting harvested images
//!
//! This module handles:
//! - The image sink capability and its filesystem implementation
//! - Deriving bounded file names from image URLs
//! - Filtering color swatch thumbnails
//! - Keeping names unique across one harvest

mod fs;
mod naming;
mod traits;

pub use fs::FsImageSink;
pub use naming::{
    derive_image_name, truncate_name, AssetName, AssetNamer, NameClaim, NameRegistry,
};
pub use traits::{ImageSink, StorageError, StorageResult};
