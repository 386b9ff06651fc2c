// src/page/http.rs
// =============================================================================
// This module fetches pages over HTTP.
//
// Key functionality:
// - The `Fetcher` trait: the one capability the crawl engine needs,
//   "give me the body of this URL"
// - `HttpFetcher`: the real implementation on top of a shared reqwest Client
// - Sorting reqwest errors into our typed `FetchError`
//
// No retries and no redirect policy of our own: reqwest's defaults apply.
// A timeout is only enforced when the config asks for one.
//
// Rust concepts:
// - Traits: so tests can swap in an in-memory fetcher
// - async-trait: async methods on a trait object-safe trait
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::error::FetchError;
use crate::config::CrawlerConfig;

/// Retrieves the raw body of a page.
///
/// Implementations must be shareable across tasks: the engine calls `fetch`
/// from many concurrently running crawl tasks.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns its body, or a typed failure.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// A `Fetcher` backed by a single pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds the client from the crawler config.
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        // A bad user agent fails here, once, instead of on every request
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        // Links reach us exactly as they appeared in the page, so relative
        // links and odd schemes are rejected here instead of inside reqwest
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| categorize_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            // The server answered; its error page is still a page
            debug!(url = %url, status = status.as_u16(), "non-success status");
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    source: e,
                }
            }
        })
    }
}

// Sorts a reqwest send error into our taxonomy
fn categorize_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            source: error,
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a trait instead of calling reqwest directly?
//    - The engine only needs "fetch(url) -> body or error"
//    - Tests can hand the engine a fake that serves pages from a HashMap
//    - No network needed to check the concurrency rules
//
// 2. What does #[async_trait] do?
//    - Rewrites `async fn` in the trait into a method returning a boxed future
//    - That lets us store the fetcher behind Arc<F> and call it from any task
//
// 3. Why is Client cloned cheaply?
//    - reqwest::Client is an Arc around a connection pool
//    - All crawl tasks share the same pool of connections
// -----------------------------------------------------------------------------
