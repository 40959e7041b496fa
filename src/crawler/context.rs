use crate::config::{HarvestConfig, RetailerEntry};
use crate::crawler::fetcher::Fetch;
use crate::crawler::parser::Extract;
use crate::storage::{AssetNamer, ImageSink, NameRegistry};
use crate::url::ProductClassifier;
use std::sync::Arc;
use std::time::Duration;

/// CSS selectors used to walk one retailer's catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetailerSelectors {
    /// Category links on a root page
    pub root_category: String,
    /// Product links on a category page
    pub product: String,
    /// The "next page" link on a category page
    pub next_page: String,
    /// Product photos on a product page
    pub image: String,
}

impl From<&RetailerEntry> for RetailerSelectors {
    fn from(entry: &RetailerEntry) -> Self {
        Self {
            root_category: entry.root_category_selector.clone(),
            product: entry.product_selector.clone(),
            next_page: entry.next_page_selector.clone(),
            image: entry.image_selector.clone(),
        }
    }
}

/// Downloader pool sizing and pacing
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub workers: usize,
    pub frontier_capacity: usize,
    /// Pause after each product page
    pub product_delay: Duration,
    pub namer: AssetNamer,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from(&HarvestConfig::default())
    }
}

impl From<&HarvestConfig> for PoolSettings {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            workers: config.workers,
            frontier_capacity: config.frontier_capacity,
            product_delay: config.product_delay(),
            namer: AssetNamer::new(config.swatch_marker.clone(), config.max_filename_len),
        }
    }
}

/// Everything a discovery task or downloader worker needs, shared across tasks
pub struct HarvestContext {
    pub fetcher: Arc<dyn Fetch>,
    pub extractor: Arc<dyn Extract>,
    pub classifier: Arc<dyn ProductClassifier>,
    pub sink: Arc<dyn ImageSink>,
    pub selectors: RetailerSelectors,
    pub namer: AssetNamer,
    /// File names claimed so far in this run
    pub names: NameRegistry,
    pub product_delay: Duration,
}
