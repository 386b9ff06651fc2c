// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Concurrent crawling: every discovered link becomes its own tokio task
// - Depth budget: each hop away from the seed spends one unit of depth
// - Exactly-once fetching: a shared visited set, claimed atomically
// - Completion detection: a pending-task counter the caller waits on
//
// Submodules:
// - engine: the crawl algorithm (`Crawler`)
// - state: the visited set and pending counter behind one lock
// - event: per-task completion events for callers that want a site map
// =============================================================================

mod engine;
mod event;
mod state;

pub use engine::{CrawlStats, Crawler};
pub use event::{CrawlEvent, TaskOutcome};
