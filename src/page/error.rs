// src/page/error.rs
// =============================================================================
// Typed failures for fetching a single page.
//
// A fetch failure is local to the crawl task that hit it: the engine logs it,
// records it as a `FetchFailed` outcome and moves on. Nothing here ever
// aborts a crawl.
//
// Note that an HTTP error status (404, 500, ...) is NOT a fetch failure.
// The server answered, so we hand back whatever body it sent.
// =============================================================================

use thiserror::Error;

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed or is not something we can request
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as it was discovered
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed
        url: String,
        /// The underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The request did not finish within the configured timeout
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out
        url: String,
    },

    /// Headers arrived but the body could not be read
    #[error("failed to read body of {url}: {source}")]
    Body {
        /// The URL whose body failed
        url: String,
        /// The underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The page could not be provided for some other reason.
    ///
    /// Used by fetchers that are not backed by HTTP.
    #[error("{url} unavailable: {reason}")]
    Unavailable {
        /// The URL that could not be provided
        url: String,
        /// Human readable cause
        reason: String,
    },
}

impl FetchError {
    /// The URL this failure belongs to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::Timeout { url }
            | FetchError::Body { url, .. }
            | FetchError::Unavailable { url, .. } => url,
        }
    }
}
