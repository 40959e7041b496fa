//! Configuration module for Catalog-Ripper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_ripper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("retailers.toml")).unwrap();
//! println!("Harvesting with {} workers", config.harvest.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetchConfig, HarvestConfig, OutputConfig, RetailerEntry, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
