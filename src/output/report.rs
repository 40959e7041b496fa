//! Harvest report types
//!
//! Every discovery task and downloader worker returns its own outcome
//! through its join handle; the retailer scraper folds them into one
//! [`HarvestReport`] so no counters are shared between tasks.

use crate::crawler::{DiscoveryOutcome, WorkerOutcome};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Where in the pipeline a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureStage {
    RootPage,
    CategoryPage,
    ProductPage,
    Image,
    Write,
    Task,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RootPage => "root page",
            Self::CategoryPage => "category page",
            Self::ProductPage => "product page",
            Self::Image => "image",
            Self::Write => "write",
            Self::Task => "task",
        };
        f.write_str(label)
    }
}

/// One abandoned unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestFailure {
    /// The URL being processed when the failure occurred
    pub url: String,

    /// The pipeline stage that failed
    pub stage: FailureStage,

    /// Error message
    pub message: String,
}

impl HarvestFailure {
    pub fn new(url: impl Into<String>, stage: FailureStage, message: impl ToString) -> Self {
        Self {
            url: url.into(),
            stage,
            message: message.to_string(),
        }
    }
}

/// Number of individual failures a [`FailureLog`] keeps by default
pub const DEFAULT_FAILURE_LIMIT: usize = 1000;

/// Failures of one task or run, bounded in memory
///
/// Every failure is counted per stage; only the first `limit` are kept
/// verbatim, so a long crawl against a broken site cannot grow it unbounded.
#[derive(Debug, Clone)]
pub struct FailureLog {
    kept: Vec<HarvestFailure>,
    counts: BTreeMap<FailureStage, u64>,
    limit: usize,
}

impl Default for FailureLog {
    fn default() -> Self {
        Self::with_limit(DEFAULT_FAILURE_LIMIT)
    }
}

impl FailureLog {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            kept: Vec::new(),
            counts: BTreeMap::new(),
            limit,
        }
    }

    pub fn record(&mut self, failure: HarvestFailure) {
        *self.counts.entry(failure.stage).or_insert(0) += 1;
        if self.kept.len() < self.limit {
            self.kept.push(failure);
        }
    }

    /// Folds another log in; its counts survive even where its entries do not fit
    pub fn merge(&mut self, other: FailureLog) {
        for (stage, count) in other.counts {
            *self.counts.entry(stage).or_insert(0) += count;
        }
        let room = self.limit.saturating_sub(self.kept.len());
        self.kept.extend(other.kept.into_iter().take(room));
    }

    /// Number of failures recorded, kept or not
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Failures beyond the limit, counted but not kept
    pub fn dropped(&self) -> u64 {
        self.total() - self.kept.len() as u64
    }

    /// Failures per pipeline stage, in stage order
    pub fn counts(&self) -> &BTreeMap<FailureStage, u64> {
        &self.counts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HarvestFailure> {
        self.kept.iter()
    }
}

/// Aggregated result of one retailer harvest
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub retailer: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Root and category pages fetched by discovery
    pub pages_visited: u64,

    /// Product URLs pushed into the frontier
    pub products_discovered: u64,

    /// Product URLs taken from the frontier and fetched
    pub products_processed: u64,

    pub images_written: u64,
    pub swatches_skipped: u64,

    /// Images already written earlier in the run from the same URL
    pub duplicates_skipped: u64,

    /// Images whose URL yielded no file name
    pub unnamed_skipped: u64,

    /// Whether the cancellation token fired during the run
    pub cancelled: bool,

    pub failures: FailureLog,
}

impl HarvestReport {
    pub fn new(retailer: impl Into<String>) -> Self {
        Self {
            retailer: retailer.into(),
            started_at: Utc::now(),
            finished_at: None,
            pages_visited: 0,
            products_discovered: 0,
            products_processed: 0,
            images_written: 0,
            swatches_skipped: 0,
            duplicates_skipped: 0,
            unnamed_skipped: 0,
            cancelled: false,
            failures: FailureLog::default(),
        }
    }

    pub fn absorb_discovery(&mut self, outcome: DiscoveryOutcome) {
        self.pages_visited += outcome.pages_visited;
        self.products_discovered += outcome.products_discovered;
        self.failures.merge(outcome.failures);
    }

    pub fn absorb_worker(&mut self, outcome: WorkerOutcome) {
        self.products_processed += outcome.products_processed;
        self.images_written += outcome.images_written;
        self.swatches_skipped += outcome.swatches_skipped;
        self.duplicates_skipped += outcome.duplicates_skipped;
        self.unnamed_skipped += outcome.unnamed_skipped;
        self.failures.merge(outcome.failures);
    }

    pub fn record_failure(&mut self, failure: HarvestFailure) {
        self.failures.record(failure);
    }

    /// Stamps the finish time
    pub fn finish(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
        self.finished_at = Some(Utc::now());
    }

    /// Seconds between start and finish, if finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// True when nothing was abandoned and the run was not cancelled
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Kept failures at one pipeline stage
    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &HarvestFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}
