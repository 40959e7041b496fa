use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Catalog-Ripper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "retailer")]
    pub retailers: Vec<RetailerEntry>,
}

impl Config {
    /// Looks up a retailer entry by name
    pub fn retailer(&self, name: &str) -> Option<&RetailerEntry> {
        self.retailers.iter().find(|r| r.name == name)
    }
}

/// Downloader pool and asset naming configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Number of downloader workers draining the frontier
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of product URLs the frontier buffers before producers block
    #[serde(rename = "frontier-capacity", default = "default_frontier_capacity")]
    pub frontier_capacity: usize,

    /// Pause after each product page (milliseconds)
    #[serde(rename = "product-delay-ms", default = "default_product_delay_ms")]
    pub product_delay_ms: u64,

    /// Maximum number of characters kept from a derived image name
    #[serde(rename = "max-filename-len", default = "default_max_filename_len")]
    pub max_filename_len: usize,

    /// Image names containing this marker are color swatches and are skipped
    #[serde(rename = "swatch-marker", default = "default_swatch_marker")]
    pub swatch_marker: String,
}

impl HarvestConfig {
    pub fn product_delay(&self) -> Duration {
        Duration::from_millis(self.product_delay_ms)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            frontier_capacity: default_frontier_capacity(),
            product_delay_ms: default_product_delay_ms(),
            max_filename_len: default_max_filename_len(),
            swatch_marker: default_swatch_marker(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Full User-Agent header value sent with every request
    pub value: String,
}

/// HTTP politeness and caching configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of in-flight requests per domain
    #[serde(
        rename = "per-domain-parallelism",
        default = "default_per_domain_parallelism"
    )]
    pub per_domain_parallelism: usize,

    /// Minimum spacing between two requests to the same domain (milliseconds)
    #[serde(rename = "per-domain-delay-ms", default = "default_per_domain_delay_ms")]
    pub per_domain_delay_ms: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory for cached responses; caching is off when unset
    #[serde(rename = "cache-dir", default)]
    pub cache_dir: Option<String>,
}

impl FetchConfig {
    pub fn per_domain_delay(&self) -> Duration {
        Duration::from_millis(self.per_domain_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            per_domain_parallelism: default_per_domain_parallelism(),
            per_domain_delay_ms: default_per_domain_delay_ms(),
            timeout_secs: default_timeout_secs(),
            cache_dir: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Base directory; each retailer writes into its own subdirectory
    pub directory: String,

    /// File extension appended to every image name
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// A retailer site and the selectors used to walk it
#[derive(Debug, Clone, Deserialize)]
pub struct RetailerEntry {
    /// Short name, also used as the output subdirectory
    pub name: String,

    /// URL fragment that only product detail pages contain
    #[serde(rename = "product-path")]
    pub product_path: String,

    /// Selector for category links on a root page
    #[serde(rename = "root-category-selector")]
    pub root_category_selector: String,

    /// Selector for product links on a category page
    #[serde(rename = "product-selector")]
    pub product_selector: String,

    /// Selector for the "next page" link on a category page
    #[serde(rename = "next-page-selector")]
    pub next_page_selector: String,

    /// Selector for product images on a product page
    #[serde(rename = "image-selector")]
    pub image_selector: String,

    /// Top-level category entry points
    #[serde(rename = "root-pages")]
    pub root_pages: Vec<String>,
}

fn default_workers() -> usize {
    4
}

fn default_frontier_capacity() -> usize {
    1024
}

fn default_product_delay_ms() -> u64 {
    1000
}

fn default_max_filename_len() -> usize {
    50
}

fn default_swatch_marker() -> String {
    "swatch".to_string()
}

fn default_per_domain_parallelism() -> usize {
    2
}

fn default_per_domain_delay_ms() -> u64 {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_extension() -> String {
    "jpeg".to_string()
}
