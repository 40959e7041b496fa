//! Catalog-Ripper: a product image harvester
//!
//! This crate walks e-commerce catalog pages, discovers product pages through
//! category pagination, and downloads every product photo it finds into a
//! local directory using a bounded pool of concurrent workers.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Ripper operations
#[derive(Debug, Error)]
pub enum RipperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("empty root page list")]
    EmptyRootPages,

    #[error("empty product URL list")]
    EmptyProductList,

    #[error("harvest cancelled before any work started")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unknown retailer: {0}")]
    UnknownRetailer(String),

    #[error("--product needs exactly one retailer, got {0}; select it with --retailer NAME")]
    ProductRetailerCount(usize),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Catalog-Ripper operations
pub type Result<T> = std::result::Result<T, RipperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{RetailerScraper, Scraper};
pub use output::HarvestReport;
pub use url::{PathFragmentClassifier, ProductClassifier};
