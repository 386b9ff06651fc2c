// src/lib.rs
// =============================================================================
// link-crawler: a concurrent, depth-bounded web crawler.
//
// Give it a seed URL and a depth budget. It fetches the seed, pulls every
// anchor href out of it and crawls those too, one tokio task per link,
// until the budget runs out. No URL is ever fetched twice in one crawl.
//
// Modules:
// - crawl: the engine and its shared bookkeeping
// - page: fetching a page and extracting its links
// - config: crawler settings, loadable from JSON
// =============================================================================

pub mod config;
pub mod crawl;
pub mod page;

pub use config::{ConfigError, CrawlerConfig};
pub use crawl::{CrawlEvent, CrawlStats, Crawler, TaskOutcome};
pub use page::{extract_links, FetchError, Fetcher, HttpFetcher};
