// src/crawl/event.rs
// =============================================================================
// Per-task completion events.
//
// The engine itself does not build a site map. Callers that want one
// subscribe to these events: every crawl task emits exactly one event when
// it retires, carrying the terminal state it reached.
// =============================================================================

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// The terminal state a crawl task retired in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// No depth budget left; nothing was fetched
    DepthExhausted,
    /// Another task already claimed this URL
    Duplicate,
    /// The fetch failed; no links were followed
    FetchFailed { error: String },
    /// Fetched and every extracted link was scheduled
    Expanded { links: usize },
}

impl TaskOutcome {
    /// Whether a fetch was attempted for this task.
    pub fn fetched(&self) -> bool {
        matches!(self, TaskOutcome::FetchFailed { .. } | TaskOutcome::Expanded { .. })
    }
}

/// One retired crawl task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlEvent {
    pub url: String,
    /// Depth budget the task was scheduled with
    pub depth: usize,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Where a crawl sends its events, if anyone is listening.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<UnboundedSender<CrawlEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: UnboundedSender<CrawlEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub(crate) fn emit(&self, url: &str, depth: usize, outcome: TaskOutcome) {
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody cares any more
            let _ = tx.send(CrawlEvent {
                url: url.to_string(),
                depth,
                outcome,
            });
        }
    }
}
