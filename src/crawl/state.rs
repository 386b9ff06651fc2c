// src/crawl/state.rs
// =============================================================================
// The shared bookkeeping for one crawl.
//
// Two pieces of mutable state are shared between crawl tasks:
// - visited: every URL that has been claimed for fetching
// - pending: how many scheduled tasks have not retired yet
// Both live under the same Mutex. The crawl is finished exactly when
// pending drops back to zero.
//
// A fresh CrawlState is created per crawl, so two crawls running at the
// same time never see each other's URLs.
// =============================================================================

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    visited: HashSet<String>,
    pending: usize,
}

/// Visited set plus pending-task counter, shared by every task of a crawl.
#[derive(Debug, Default)]
pub(crate) struct CrawlState {
    inner: Mutex<Inner>,
    idle: Notify,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    // Nothing inside the lock can panic halfway through an update,
    // so a poisoned lock still holds consistent data
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers one more outstanding task. Call before spawning it.
    pub fn schedule(&self) {
        self.lock().pending += 1;
    }

    /// Claims `url` for fetching.
    ///
    /// Returns `true` for the first caller only. Check and mark happen in
    /// one critical section, so two tasks racing on the same URL can never
    /// both get `true`.
    pub fn try_visit(&self, url: &str) -> bool {
        self.lock().visited.insert(url.to_string())
    }

    /// Marks one task as finished and wakes waiters if it was the last.
    pub fn retire(&self) {
        let mut inner = self.lock();
        inner.pending = inner.pending.saturating_sub(1);
        if inner.pending == 0 {
            self.idle.notify_waiters();
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Waits until every scheduled task has retired.
    ///
    /// Tasks may keep scheduling children while we wait; we only return
    /// once the counter is observed at zero.
    pub async fn wait_idle(&self) {
        loop {
            // Register interest before reading the counter so a retire()
            // landing in between still wakes us
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Retires its task when dropped, even if the task unwinds.
pub(crate) struct RetireGuard<'a> {
    state: &'a CrawlState,
}

impl<'a> RetireGuard<'a> {
    pub fn new(state: &'a CrawlState) -> Self {
        Self { state }
    }
}

impl Drop for RetireGuard<'_> {
    fn drop(&mut self) {
        self.state.retire();
    }
}
