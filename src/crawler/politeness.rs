//! Per-domain request politeness
//!
//! Every domain gets its own slot: a semaphore bounding in-flight requests
//! and a record of the last request time used to space requests apart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Request timing for one domain
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests made to this domain
    pub request_count: u32,

    /// Timestamp of the last request to this domain
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a request was made to this domain
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.duration_since(last);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }
}

struct DomainSlot {
    permits: Arc<Semaphore>,
    state: tokio::sync::Mutex<DomainState>,
}

/// Held for the duration of one request; releases the domain slot on drop
pub struct DomainPermit {
    _permit: OwnedSemaphorePermit,
}

/// Gates requests per domain by parallelism and minimum spacing
pub struct PolitenessGate {
    parallelism: usize,
    delay: Duration,
    slots: Mutex<HashMap<String, Arc<DomainSlot>>>,
}

impl PolitenessGate {
    pub fn new(parallelism: usize, delay: Duration) -> Self {
        Self {
            parallelism: parallelism.max(1),
            delay,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, domain: &str) -> Arc<DomainSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(domain.to_string())
            .or_insert_with(|| {
                Arc::new(DomainSlot {
                    permits: Arc::new(Semaphore::new(self.parallelism)),
                    state: tokio::sync::Mutex::new(DomainState::new()),
                })
            })
            .clone()
    }

    /// Waits until a request to `domain` is allowed
    ///
    /// Requests to one domain start at least `delay` apart, and at most
    /// `parallelism` of them are in flight while their permits are held.
    pub async fn acquire(&self, domain: &str) -> Result<DomainPermit, AcquireError> {
        let slot = self.slot(domain);
        let permit = slot.permits.clone().acquire_owned().await?;

        let mut state = slot.state.lock().await;
        if let Some(wait) = state.time_until_next_request(self.delay, Instant::now()) {
            tracing::trace!("Waiting {:?} before next request to {}", wait, domain);
            tokio::time::sleep(wait).await;
        }
        state.record_request(Instant::now());

        Ok(DomainPermit { _permit: permit })
    }

    /// Number of requests let through for `domain` so far
    #[cfg(test)]
    pub async fn request_count(&self, domain: &str) -> u32 {
        self.slot(domain).state.lock().await.request_count
    }
}
