//! Category discovery
//!
//! One [`DiscoveryDriver`] walks one root page: it collects the root's
//! category links, then follows each category's pagination chain, pushing
//! every product link it finds into the frontier.

use crate::crawler::context::HarvestContext;
use crate::crawler::fetcher::{fetch_with_cancel, FetchedPage};
use crate::crawler::frontier::FrontierWriter;
use crate::crawler::parser::attribute_values;
use crate::output::{FailureLog, FailureStage, HarvestFailure};
use crate::url::resolve_link;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What one discovery task accomplished
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Root and category pages fetched
    pub pages_visited: u64,

    /// Product URLs pushed into the frontier
    pub products_discovered: u64,

    pub failures: FailureLog,
}

impl DiscoveryOutcome {
    pub fn merge(&mut self, other: DiscoveryOutcome) {
        self.pages_visited += other.pages_visited;
        self.products_discovered += other.products_discovered;
        self.failures.merge(other.failures);
    }

    fn fail(&mut self, url: &str, stage: FailureStage, message: impl ToString) {
        let failure = HarvestFailure::new(url, stage, message);
        tracing::warn!("Abandoning {} {}: {}", stage, url, failure.message);
        self.failures.record(failure);
    }
}

/// Walks the category pages reachable from one root page
pub struct DiscoveryDriver {
    ctx: Arc<HarvestContext>,
    frontier: FrontierWriter,
    cancel: CancellationToken,
}

impl DiscoveryDriver {
    pub fn new(ctx: Arc<HarvestContext>, frontier: FrontierWriter, cancel: CancellationToken) -> Self {
        Self {
            ctx,
            frontier,
            cancel,
        }
    }

    /// Discovers every product reachable from `root_page`
    ///
    /// Never closes the frontier; the writer handle is dropped on return.
    pub async fn run(self, root_page: String) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();

        if self.cancel.is_cancelled() {
            return outcome;
        }

        tracing::info!("Discovering categories from {}", root_page);
        let Some(root) = self
            .visit(&root_page, FailureStage::RootPage, &mut outcome)
            .await
        else {
            return outcome;
        };

        let categories = match self.links(&root, &self.ctx.selectors.root_category) {
            Ok(links) => links,
            Err(message) => {
                outcome.fail(&root_page, FailureStage::RootPage, message);
                return outcome;
            }
        };
        tracing::debug!("{} categories under {}", categories.len(), root_page);

        for category in categories {
            if self.cancel.is_cancelled() {
                break;
            }
            if self.walk_category(category, &mut outcome).await.is_break() {
                break;
            }
        }

        tracing::info!(
            "Discovery of {} finished: {} pages, {} products",
            root_page,
            outcome.pages_visited,
            outcome.products_discovered
        );
        outcome
    }

    /// Follows one pagination chain until it has no next page
    ///
    /// Breaks when the whole driver must stop (cancellation or no readers).
    async fn walk_category(&self, start: String, outcome: &mut DiscoveryOutcome) -> ControlFlow<()> {
        let mut visited = HashSet::new();
        let mut next = Some(start);

        while let Some(page_url) = next.take() {
            if self.cancel.is_cancelled() {
                return ControlFlow::Break(());
            }

            if !visited.insert(page_url.clone()) {
                tracing::warn!("Pagination loops back to {}, stopping chain", page_url);
                break;
            }

            let Some(page) = self
                .visit(&page_url, FailureStage::CategoryPage, outcome)
                .await
            else {
                break;
            };

            let products = match self.links(&page, &self.ctx.selectors.product) {
                Ok(links) => links,
                Err(message) => {
                    outcome.fail(&page_url, FailureStage::CategoryPage, message);
                    break;
                }
            };

            for product in products {
                if !self.ctx.classifier.is_product(&product) {
                    continue;
                }
                if let Err(e) = self.frontier.put(product, &self.cancel).await {
                    tracing::debug!("Stopping discovery at {}: {}", page_url, e);
                    return ControlFlow::Break(());
                }
                outcome.products_discovered += 1;
            }

            match self.links(&page, &self.ctx.selectors.next_page) {
                Ok(links) => next = links.into_iter().next(),
                Err(message) => outcome.fail(&page_url, FailureStage::CategoryPage, message),
            }
        }

        ControlFlow::Continue(())
    }

    /// Fetches one page, recording a failure if it cannot be had
    async fn visit(
        &self,
        url: &str,
        stage: FailureStage,
        outcome: &mut DiscoveryOutcome,
    ) -> Option<FetchedPage> {
        match fetch_with_cancel(self.ctx.fetcher.as_ref(), url, &self.cancel).await {
            Ok(page) => {
                outcome.pages_visited += 1;
                Some(page)
            }
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                outcome.fail(url, stage, &e);
                None
            }
        }
    }

    /// Resolved `href` values of the elements matching `selector`
    fn links(&self, page: &FetchedPage, selector: &str) -> Result<Vec<String>, String> {
        let base = Url::parse(&page.url).map_err(|e| format!("bad page URL: {}", e))?;
        let elements = self
            .ctx
            .extractor
            .extract(&page.body, selector)
            .map_err(|e| e.to_string())?;

        Ok(attribute_values(&elements, "href")
            .filter_map(|href| resolve_link(href, &base))
            .collect())
    }
}
