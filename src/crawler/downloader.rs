//! Downloader pool workers
//!
//! Each [`Downloader`] drains product URLs from the frontier, fetches the
//! product page, and writes every non-swatch image on it to the sink.

use crate::crawler::context::HarvestContext;
use crate::crawler::fetcher::{fetch_with_cancel, FetchedPage};
use crate::crawler::frontier::FrontierReader;
use crate::output::{FailureLog, FailureStage, HarvestFailure};
use crate::storage::{AssetName, NameClaim};
use crate::url::resolve_link;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Image attributes tried in order; lazy-loaded images keep the real URL in `data-src`
const IMAGE_SOURCE_ATTRIBUTES: &[&str] = &["src", "data-src"];

/// What one worker accomplished
#[derive(Debug, Default)]
pub struct WorkerOutcome {
    /// Product URLs taken from the frontier
    pub products_processed: u64,
    pub images_written: u64,
    pub swatches_skipped: u64,
    /// Images whose URL was already written earlier in the run
    pub duplicates_skipped: u64,
    pub unnamed_skipped: u64,
    pub failures: FailureLog,
}

impl WorkerOutcome {
    fn fail(&mut self, url: &str, stage: FailureStage, message: impl ToString) {
        let failure = HarvestFailure::new(url, stage, message);
        tracing::warn!("Abandoning {} {}: {}", stage, url, failure.message);
        self.failures.record(failure);
    }
}

/// One worker of the downloader pool
pub struct Downloader {
    id: usize,
    ctx: Arc<HarvestContext>,
    frontier: FrontierReader,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(
        id: usize,
        ctx: Arc<HarvestContext>,
        frontier: FrontierReader,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            ctx,
            frontier,
            cancel,
        }
    }

    /// Drains the frontier until it is closed and empty, or until cancelled
    pub async fn run(self) -> WorkerOutcome {
        let mut outcome = WorkerOutcome::default();
        let delay = self.ctx.product_delay;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = self.frontier.next() => next,
            };
            let Some(product_url) = next else {
                break;
            };

            if self.cancel.is_cancelled() {
                tracing::debug!("Dropping {} after cancellation", product_url);
                break;
            }

            outcome.products_processed += 1;
            self.download_product(&product_url, &mut outcome).await;

            if !delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::debug!(
            "Worker {} done: {} products, {} images",
            self.id,
            outcome.products_processed,
            outcome.images_written
        );
        outcome
    }

    /// Fetches one product page and persists its images
    async fn download_product(&self, product_url: &str, outcome: &mut WorkerOutcome) {
        let fetcher = self.ctx.fetcher.as_ref();

        let page = match fetch_with_cancel(fetcher, product_url, &self.cancel).await {
            Ok(page) => page,
            Err(e) if e.is_cancelled() => return,
            Err(e) => return outcome.fail(product_url, FailureStage::ProductPage, &e),
        };

        let base = match Url::parse(&page.url) {
            Ok(base) => base,
            Err(e) => return outcome.fail(product_url, FailureStage::ProductPage, e),
        };

        let elements = match self.ctx.extractor.extract(&page.body, &self.ctx.selectors.image) {
            Ok(elements) => elements,
            Err(e) => return outcome.fail(product_url, FailureStage::ProductPage, e),
        };

        let image_urls: Vec<String> = elements
            .iter()
            .filter_map(|element| {
                IMAGE_SOURCE_ATTRIBUTES
                    .iter()
                    .find_map(|name| element.attr(name))
            })
            .filter_map(|src| resolve_link(src, &base))
            .collect();
        tracing::debug!("{} images on {}", image_urls.len(), product_url);

        for image_url in image_urls {
            if self.cancel.is_cancelled() {
                return;
            }

            let image = match fetch_with_cancel(fetcher, &image_url, &self.cancel).await {
                Ok(image) => image,
                Err(e) if e.is_cancelled() => return,
                Err(e) => {
                    outcome.fail(&image_url, FailureStage::Image, &e);
                    continue;
                }
            };

            match self.ctx.namer.name_for(&image.url) {
                AssetName::Keep(name) => self.persist(&name, &image_url, &image, outcome).await,
                AssetName::Swatch(name) => {
                    tracing::trace!("Skipping swatch {}", name);
                    outcome.swatches_skipped += 1;
                }
                AssetName::Unnamed => {
                    tracing::debug!("No file name in {}, skipping", image.url);
                    outcome.unnamed_skipped += 1;
                }
            }
        }
    }

    /// Writes one image under a name no other image of this run holds
    async fn persist(
        &self,
        name: &str,
        image_url: &str,
        image: &FetchedPage,
        outcome: &mut WorkerOutcome,
    ) {
        let name = match self.ctx.names.claim(name, &image.url) {
            NameClaim::Fresh(name) => name,
            NameClaim::Repeat(name) => {
                tracing::debug!("{} already written as {}", image.url, name);
                outcome.duplicates_skipped += 1;
                return;
            }
        };

        match self.ctx.sink.write(&name, &image.body).await {
            Ok(path) => {
                tracing::debug!("Wrote {} from {}", path.display(), image.url);
                outcome.images_written += 1;
            }
            Err(e) => {
                self.ctx.names.release(&name, &image.url);
                outcome.fail(image_url, FailureStage::Write, &e);
            }
        }
    }
}

