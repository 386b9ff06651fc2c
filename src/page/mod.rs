// src/page/mod.rs
// =============================================================================
// Everything the crawler does with a single page.
//
// Submodules:
// - http: Fetches a page body (the `Fetcher` trait and its HTTP implementation)
// - html: Pulls anchor hrefs out of a page body
// - error: The typed failures a fetch can produce
//
// The engine in `crate::crawl` only talks to the items re-exported here.
// =============================================================================

mod error;
mod html;
mod http;

pub use error::FetchError;
pub use html::extract_links;
pub use http::{Fetcher, HttpFetcher};
