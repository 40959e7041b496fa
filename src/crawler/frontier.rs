//! Product URL frontier
//!
//! A bounded queue between category discovery and the downloader pool.
//! Writers block when it is full. The queue shuts once the last writer
//! handle is gone; the retailer scraper guarantees that happens in exactly
//! one place, the barrier task, after every discovery task has joined.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Why a product URL could not be queued
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PutError {
    #[error("frontier put cancelled")]
    Cancelled,

    #[error("every frontier reader is gone")]
    NoReaders,
}

/// Creates an empty frontier holding at most `capacity` pending URLs
pub fn frontier(capacity: usize) -> (FrontierWriter, FrontierReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        FrontierWriter { tx },
        FrontierReader {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side, held by discovery tasks
#[derive(Debug, Clone)]
pub struct FrontierWriter {
    tx: mpsc::Sender<String>,
}

impl FrontierWriter {
    /// Queues a product URL, waiting while the frontier is full
    pub async fn put(&self, url: String, cancel: &CancellationToken) -> Result<(), PutError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PutError::Cancelled),
            sent = self.tx.send(url) => sent.map_err(|_| PutError::NoReaders),
        }
    }

    /// Closes the frontier for writing
    ///
    /// Consumes the handle so it cannot be written to or closed again.
    /// Readers see exhaustion once every other writer clone has also
    /// been dropped and the remaining items are drained.
    pub fn close(self) {
        tracing::debug!(
            "Frontier closed for writing with {} URLs pending",
            self.tx.max_capacity() - self.tx.capacity()
        );
    }
}

/// Consumer side, shared by downloader workers
///
/// Each queued URL is handed to exactly one caller of [`next`](Self::next).
#[derive(Debug, Clone)]
pub struct FrontierReader {
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl FrontierReader {
    /// Takes the next URL; `None` once the frontier is closed and empty
    pub async fn next(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }
}
