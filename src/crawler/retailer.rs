//! Retailer scraper - harvest orchestration
//!
//! This module ties the pipeline together for one retailer:
//! - One discovery task per root page, all running concurrently
//! - A barrier task that closes the frontier once every discovery task joined
//! - A fixed pool of downloader workers draining the frontier
//! - Folding every task outcome into a single harvest report

use crate::config::{Config, RetailerEntry};
use crate::crawler::context::{HarvestContext, PoolSettings, RetailerSelectors};
use crate::crawler::discovery::{DiscoveryDriver, DiscoveryOutcome};
use crate::crawler::downloader::{Downloader, WorkerOutcome};
use crate::crawler::fetcher::Fetch;
use crate::crawler::frontier::{frontier, FrontierReader, FrontierWriter};
use crate::crawler::parser::{Extract, HtmlExtractor};
use crate::output::{FailureStage, HarvestFailure, HarvestReport};
use crate::storage::{FsImageSink, ImageSink, NameRegistry};
use crate::url::{PathFragmentClassifier, ProductClassifier};
use crate::{Result, RipperError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Harvests one retailer's catalog
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Retailer name, used for logging and output layout
    fn name(&self) -> &str;

    /// Runs a complete harvest until the catalog is exhausted or `cancel` fires
    async fn process(&self, cancel: &CancellationToken) -> Result<HarvestReport>;
}

/// Static description of a retailer site
#[derive(Debug, Clone)]
pub struct RetailerProfile {
    pub name: String,
    pub root_pages: Vec<String>,
    pub selectors: RetailerSelectors,
    /// URL fragment that marks product detail pages
    pub product_path: String,
}

impl From<&RetailerEntry> for RetailerProfile {
    fn from(entry: &RetailerEntry) -> Self {
        Self {
            name: entry.name.clone(),
            root_pages: entry.root_pages.clone(),
            selectors: RetailerSelectors::from(entry),
            product_path: entry.product_path.clone(),
        }
    }
}

/// Discovery, frontier and downloader pool for one retailer
pub struct RetailerScraper {
    profile: RetailerProfile,
    fetcher: Arc<dyn Fetch>,
    extractor: Arc<dyn Extract>,
    classifier: Arc<dyn ProductClassifier>,
    sink: Arc<dyn ImageSink>,
    settings: PoolSettings,
}

impl RetailerScraper {
    /// Creates a scraper with the HTML extractor, a product-path classifier
    /// and default pool settings
    pub fn new(profile: RetailerProfile, fetcher: Arc<dyn Fetch>, sink: Arc<dyn ImageSink>) -> Self {
        let classifier = Arc::new(PathFragmentClassifier::new(profile.product_path.clone()));
        Self {
            profile,
            fetcher,
            extractor: Arc::new(HtmlExtractor),
            classifier,
            sink,
            settings: PoolSettings::default(),
        }
    }

    /// Builds a scraper for a configured retailer
    ///
    /// Images land in `<output.directory>/<retailer name>/`.
    pub fn from_config(entry: &RetailerEntry, config: &Config, fetcher: Arc<dyn Fetch>) -> Self {
        let directory = Path::new(&config.output.directory).join(&entry.name);
        let sink = Arc::new(FsImageSink::new(directory, config.output.extension.clone()));

        Self::new(RetailerProfile::from(entry), fetcher, sink)
            .with_settings(PoolSettings::from(&config.harvest))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extract>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ProductClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_settings(mut self, settings: PoolSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn profile(&self) -> &RetailerProfile {
        &self.profile
    }

    fn context(&self) -> Arc<HarvestContext> {
        Arc::new(HarvestContext {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            classifier: self.classifier.clone(),
            sink: self.sink.clone(),
            selectors: self.profile.selectors.clone(),
            namer: self.settings.namer.clone(),
            names: NameRegistry::new(self.settings.namer.max_len()),
            product_delay: self.settings.product_delay,
        })
    }

    /// Discovers every product under the root pages and downloads their images
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestReport)` - Harvest ran; per-item failures are in the report
    /// * `Err(RipperError::EmptyRootPages)` - No root pages; nothing was started
    /// * `Err(RipperError::Cancelled)` - Cancelled before discovery started
    pub async fn process(&self, cancel: &CancellationToken) -> Result<HarvestReport> {
        if self.profile.root_pages.is_empty() {
            tracing::error!("{}: {}", self.profile.name, RipperError::EmptyRootPages);
            return Err(RipperError::EmptyRootPages);
        }

        if cancel.is_cancelled() {
            return Err(RipperError::Cancelled);
        }

        let span = tracing::info_span!("retailer", name = %self.profile.name);
        self.harvest(cancel).instrument(span).await
    }

    async fn harvest(&self, cancel: &CancellationToken) -> Result<HarvestReport> {
        let ctx = self.context();
        let (writer, reader) = frontier(self.settings.frontier_capacity);

        tracing::info!(
            "Starting harvest: {} root pages, {} workers",
            self.profile.root_pages.len(),
            self.settings.workers
        );

        let mut drivers = JoinSet::new();
        for root_page in &self.profile.root_pages {
            if cancel.is_cancelled() {
                tracing::info!("Cancelled, not launching discovery for remaining root pages");
                break;
            }

            let driver = DiscoveryDriver::new(ctx.clone(), writer.clone(), cancel.clone());
            let span = tracing::info_span!("discovery", root = %root_page);
            drivers.spawn(driver.run(root_page.clone()).instrument(span));
        }

        let barrier = spawn_barrier(drivers, writer);
        let pool = spawn_pool(&ctx, reader, cancel, self.settings.workers);

        Ok(self.collect(barrier, pool, cancel).await)
    }

    /// Downloads images for an explicit list of product pages, skipping discovery
    pub async fn process_products(
        &self,
        product_urls: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<HarvestReport> {
        if product_urls.is_empty() {
            return Err(RipperError::EmptyProductList);
        }

        if cancel.is_cancelled() {
            return Err(RipperError::Cancelled);
        }

        let span = tracing::info_span!("retailer", name = %self.profile.name);
        async move {
            let ctx = self.context();
            let (writer, reader) = frontier(self.settings.frontier_capacity);

            tracing::info!("Harvesting {} product pages", product_urls.len());

            let seeder_cancel = cancel.clone();
            let seeder = tokio::spawn(
                async move {
                    let mut outcome = DiscoveryOutcome::default();
                    for url in product_urls {
                        if writer.put(url, &seeder_cancel).await.is_err() {
                            break;
                        }
                        outcome.products_discovered += 1;
                    }
                    writer.close();
                    outcome
                }
                .in_current_span(),
            );
            let pool = spawn_pool(&ctx, reader, cancel, self.settings.workers);

            Ok(self.collect(seeder, pool, cancel).await)
        }
        .instrument(span)
        .await
    }

    /// Waits for the pool to drain, then for the producers, and builds the report
    async fn collect(
        &self,
        producers: JoinHandle<DiscoveryOutcome>,
        mut pool: JoinSet<WorkerOutcome>,
        cancel: &CancellationToken,
    ) -> HarvestReport {
        let mut report = HarvestReport::new(self.profile.name.clone());

        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(outcome) => report.absorb_worker(outcome),
                Err(e) => report.record_failure(task_failure("downloader", e)),
            }
        }

        match producers.await {
            Ok(outcome) => report.absorb_discovery(outcome),
            Err(e) => report.record_failure(task_failure("discovery", e)),
        }

        report.finish(cancel.is_cancelled());
        tracing::info!(
            "Harvest finished: {} products, {} images written, {} failures",
            report.products_processed,
            report.images_written,
            report.failures.total()
        );
        report
    }
}

#[async_trait]
impl Scraper for RetailerScraper {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn process(&self, cancel: &CancellationToken) -> Result<HarvestReport> {
        RetailerScraper::process(self, cancel).await
    }
}

/// Joins every discovery task, then closes the frontier
///
/// This task owns the last frontier writer handle outside the drivers, so
/// the frontier shuts here and nowhere else.
fn spawn_barrier(
    mut drivers: JoinSet<DiscoveryOutcome>,
    writer: FrontierWriter,
) -> JoinHandle<DiscoveryOutcome> {
    tokio::spawn(
        async move {
            let mut discovery = DiscoveryOutcome::default();
            while let Some(joined) = drivers.join_next().await {
                match joined {
                    Ok(outcome) => discovery.merge(outcome),
                    Err(e) => discovery.failures.record(task_failure("discovery", e)),
                }
            }

            writer.close();
            tracing::info!(
                "Discovery complete: {} product URLs queued",
                discovery.products_discovered
            );
            discovery
        }
        .in_current_span(),
    )
}

/// Starts `workers` downloaders sharing one frontier reader
fn spawn_pool(
    ctx: &Arc<HarvestContext>,
    reader: FrontierReader,
    cancel: &CancellationToken,
    workers: usize,
) -> JoinSet<WorkerOutcome> {
    let mut pool = JoinSet::new();
    for id in 0..workers.max(1) {
        let worker = Downloader::new(id, ctx.clone(), reader.clone(), cancel.clone());
        let span = tracing::info_span!("worker", id);
        pool.spawn(worker.run().instrument(span));
    }
    pool
}

fn task_failure(task: &str, e: tokio::task::JoinError) -> HarvestFailure {
    tracing::error!("{} task failed: {}", task, e);
    HarvestFailure::new(task, FailureStage::Task, e)
}
