//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with the configured user agent
//! - Per-domain parallelism and request spacing
//! - The optional on-disk response cache
//! - Error classification
//! - Racing fetches against the cancellation token

use crate::config::{FetchConfig, UserAgentConfig};
use crate::crawler::cache::ResponseCache;
use crate::crawler::politeness::PolitenessGate;
use crate::url::extract_domain;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A successfully fetched resource
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Raw response body
    pub body: Vec<u8>,

    /// Whether the body came from the response cache
    pub from_cache: bool,
}

/// Why a fetch produced no usable body
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Fetch of {url} cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// The URL that failed
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Transport { url, .. }
            | Self::InvalidUrl { url, .. }
            | Self::Cancelled { url } => url,
        }
    }

    /// The HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            Self::Timeout { url }
        } else if e.is_connect() {
            Self::Connect {
                url,
                message: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            Self::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            Self::Transport {
                url,
                message: e.to_string(),
            }
        }
    }
}

/// Capability to GET one URL
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `url`; non-success statuses are errors
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Fetches `url`, giving up as soon as `cancel` fires
///
/// Dropping the in-flight request aborts it, so no fetch outlives a
/// cancelled harvest.
pub async fn fetch_with_cancel(
    fetcher: &dyn Fetch,
    url: &str,
    cancel: &CancellationToken,
) -> Result<FetchedPage, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled { url: url.to_string() }),
        result = fetcher.fetch(url) => result,
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use catalog_ripper::config::UserAgentConfig;
/// use catalog_ripper::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     value: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.value.clone())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetch`] with politeness and optional caching
pub struct HttpFetcher {
    client: Client,
    gate: PolitenessGate,
    cache: Option<ResponseCache>,
}

impl HttpFetcher {
    pub fn new(user_agent: &UserAgentConfig, config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, config.timeout())?;
        Ok(Self {
            client,
            gate: PolitenessGate::new(config.per_domain_parallelism, config.per_domain_delay()),
            cache: config.cache_dir.as_ref().map(ResponseCache::new),
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if let Some(cache) = &self.cache {
            if let Some(page) = cache.load(url).await {
                tracing::trace!("Cache hit for {}", url);
                return Ok(page);
            }
        }

        let domain = extract_domain(&parsed).ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            message: "missing host".to_string(),
        })?;

        let _permit = self
            .gate
            .acquire(&domain)
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let page = FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body: body.to_vec(),
            from_cache: false,
        };

        if let Some(cache) = &self.cache {
            cache.store(url, &page).await;
        }

        Ok(page)
    }
}
