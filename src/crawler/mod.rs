//! Crawler module for catalog discovery and image downloads
//!
//! This module contains the harvesting pipeline, including:
//! - HTTP fetching with per-domain politeness and response caching
//! - HTML element extraction
//! - The product URL frontier
//! - Category discovery and the downloader pool
//! - Per-retailer orchestration

mod cache;
mod context;
mod discovery;
mod downloader;
mod fetcher;
mod frontier;
mod parser;
mod politeness;
mod retailer;

pub use cache::ResponseCache;
pub use context::{HarvestContext, PoolSettings, RetailerSelectors};
pub use discovery::{DiscoveryDriver, DiscoveryOutcome};
pub use downloader::{Downloader, WorkerOutcome};
pub use fetcher::{
    build_http_client, fetch_with_cancel, Fetch, FetchError, FetchedPage, HttpFetcher,
};
pub use frontier::{frontier, FrontierReader, FrontierWriter, PutError};
pub use parser::{attribute_values, Element, Extract, ExtractError, HtmlExtractor};
pub use politeness::{DomainPermit, DomainState, PolitenessGate};
pub use retailer::{RetailerProfile, RetailerScraper, Scraper};
