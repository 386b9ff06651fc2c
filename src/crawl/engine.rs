// src/crawl/engine.rs
// =============================================================================
// This module implements the concurrent, depth-bounded crawl.
//
// How it works:
// 1. `start` schedules one task for the seed URL with the full depth budget
// 2. Every task runs on its own tokio task:
//    - depth 0             -> retire (depth exhausted)
//    - URL already claimed -> retire (duplicate)
//    - fetch fails         -> log, retire (fetch failed)
//    - otherwise extract links and schedule one child per link at depth - 1
// 3. `start` waits until the pending counter is back at zero
//
// Children do their own duplicate check, so we schedule every link we find.
// A task retires right after scheduling its children; it does not wait for
// them.
//
// Fan-out is unbounded: one tokio task per scheduled link. With
// `max_concurrency` set, a semaphore caps how many of those tasks may be
// inside a fetch at once. Scheduling and bookkeeping are unaffected.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};

use super::event::{CrawlEvent, EventSink, TaskOutcome};
use super::state::{CrawlState, RetireGuard};
use crate::config::CrawlerConfig;
use crate::page::{extract_links, Fetcher};

/// Counters for one finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Tasks that fetched successfully and scheduled their links
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub duplicates: usize,
    pub depth_exhausted: usize,
    /// Distinct URLs claimed for fetching
    pub urls_visited: usize,
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Every task that was scheduled during the crawl.
    pub fn tasks(&self) -> usize {
        self.pages_fetched + self.fetch_failures + self.duplicates + self.depth_exhausted
    }
}

/// The crawl engine.
///
/// A `Crawler` can run any number of crawls, one after another or at the
/// same time. Each call to [`Crawler::start`] gets its own visited set.
pub struct Crawler<F> {
    fetcher: Arc<F>,
    config: CrawlerConfig,
    events: EventSink,
}

impl<F> Crawler<F>
where
    F: Fetcher + 'static,
{
    pub fn new(fetcher: F, config: CrawlerConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
            events: EventSink::default(),
        }
    }

    /// Sends one [`CrawlEvent`] per retired task to `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<CrawlEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawls from `seed` using the configured depth budget.
    pub async fn run(&self, seed: &str) -> CrawlStats {
        self.start(seed, self.config.max_depth).await
    }

    /// Crawls from `seed` with a depth budget of `max_depth`.
    ///
    /// Returns only once every task scheduled during the crawl, directly or
    /// transitively, has retired. Fetch failures never abort the crawl.
    pub async fn start(&self, seed: &str, max_depth: usize) -> CrawlStats {
        let started = Instant::now();
        let crawl = Arc::new(Crawl {
            fetcher: Arc::clone(&self.fetcher),
            state: CrawlState::new(),
            limiter: fetch_limiter(self.config.max_concurrency),
            events: self.events.clone(),
            counters: Counters::default(),
        });

        info!(seed = %seed, max_depth, "starting crawl");
        Crawl::schedule(&crawl, seed.to_string(), max_depth);
        crawl.state.wait_idle().await;

        let stats = crawl.stats(started.elapsed());
        info!(
            fetched = stats.pages_fetched,
            failed = stats.fetch_failures,
            duplicates = stats.duplicates,
            elapsed = ?stats.elapsed,
            "crawl finished"
        );
        stats
    }
}

// Configs that skipped validation still get a usable limiter:
// 0 means unbounded, anything too large is capped
fn fetch_limiter(max_concurrency: Option<usize>) -> Option<Semaphore> {
    max_concurrency
        .filter(|limit| *limit > 0)
        .map(|limit| Semaphore::new(limit.min(Semaphore::MAX_PERMITS)))
}

#[derive(Debug, Default)]
struct Counters {
    fetched: AtomicUsize,
    failed: AtomicUsize,
    duplicates: AtomicUsize,
    depth_exhausted: AtomicUsize,
}

impl Counters {
    fn record(&self, outcome: &TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::DepthExhausted => &self.depth_exhausted,
            TaskOutcome::Duplicate => &self.duplicates,
            TaskOutcome::FetchFailed { .. } => &self.failed,
            TaskOutcome::Expanded { .. } => &self.fetched,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// Everything one crawl shares between its tasks
struct Crawl<F> {
    fetcher: Arc<F>,
    state: CrawlState,
    limiter: Option<Semaphore>,
    events: EventSink,
    counters: Counters,
}

impl<F> Crawl<F>
where
    F: Fetcher + 'static,
{
    // Count first, then spawn: the counter can never hit zero while a
    // task we are about to start is still unaccounted for
    fn schedule(crawl: &Arc<Self>, url: String, depth: usize) {
        crawl.state.schedule();
        tokio::spawn(Arc::clone(crawl).visit(url, depth));
    }

    fn visit(self: Arc<Self>, url: String, depth: usize) -> BoxFuture<'static, ()> {
        async move {
            let _retire = RetireGuard::new(&self.state);

            let outcome = self.expand(&url, depth).await;
            self.counters.record(&outcome);
            self.events.emit(&url, depth, outcome);
        }
        .boxed()
    }

    async fn expand(self: &Arc<Self>, url: &str, depth: usize) -> TaskOutcome {
        if depth == 0 {
            return TaskOutcome::DepthExhausted;
        }

        if !self.state.try_visit(url) {
            debug!(url = %url, "already visited");
            return TaskOutcome::Duplicate;
        }

        info!(url = %url, depth, "Fetching");
        let fetched = {
            let _permit = self.acquire().await;
            self.fetcher.fetch(url).await
        };

        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, error = %e, "Error fetching");
                return TaskOutcome::FetchFailed {
                    error: e.to_string(),
                };
            }
        };

        let links = extract_links(&body);
        debug!(url = %url, links = links.len(), "extracted links");

        let count = links.len();
        for link in links {
            Self::schedule(self, link, depth - 1);
        }

        TaskOutcome::Expanded { links: count }
    }

    async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        match &self.limiter {
            // The semaphore is never closed, so acquire only fails in theory
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        }
    }

    fn stats(&self, elapsed: Duration) -> CrawlStats {
        CrawlStats {
            pages_fetched: self.counters.fetched.load(Ordering::Relaxed),
            fetch_failures: self.counters.failed.load(Ordering::Relaxed),
            duplicates: self.counters.duplicates.load(Ordering::Relaxed),
            depth_exhausted: self.counters.depth_exhausted.load(Ordering::Relaxed),
            urls_visited: self.state.visited_count(),
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::FetchError;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    // Serves pages from an in-memory link graph and counts every fetch
    #[derive(Default)]
    struct GraphFetcher {
        pages: HashMap<String, Vec<String>>,
        failing: HashSet<String>,
        delay: Option<Duration>,
        calls: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl GraphFetcher {
        fn new(graph: &[(&str, &[&str])]) -> Self {
            let pages = graph
                .iter()
                .map(|(url, links)| {
                    (url.to_string(), links.iter().map(|l| l.to_string()).collect())
                })
                .collect();
            Self {
                pages,
                ..Self::default()
            }
        }

        fn failing(mut self, url: &str) -> Self {
            self.failing.insert(url.to_string());
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }

        fn fetched(&self) -> HashSet<String> {
            self.calls.lock().unwrap().keys().cloned().collect()
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl Fetcher for GraphFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(url) {
                return Err(FetchError::Unavailable {
                    url: url.to_string(),
                    reason: "marked as failing".to_string(),
                });
            }

            match self.pages.get(url) {
                Some(links) => Ok(links
                    .iter()
                    .map(|l| format!(r#"<a href="{l}">{l}</a>"#))
                    .collect()),
                None => Err(FetchError::Unavailable {
                    url: url.to_string(),
                    reason: "not in graph".to_string(),
                }),
            }
        }
    }

    // Wraps a shared fetcher so the test can keep inspecting it
    struct Shared(Arc<GraphFetcher>);

    #[async_trait]
    impl Fetcher for Shared {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.0.fetch(url).await
        }
    }

    fn crawler(fetcher: &Arc<GraphFetcher>) -> Crawler<Shared> {
        Crawler::new(Shared(fetcher.clone()), CrawlerConfig::default())
    }

    fn set(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn scenario() -> GraphFetcher {
        GraphFetcher::new(&[
            ("p1", &["p2", "p3"]),
            ("p2", &["p1", "p4"]),
            ("p3", &[]),
            ("p4", &[]),
        ])
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_depth_zero_fetches_nothing() {
        let fetcher = Arc::new(scenario());
        let stats = crawler(&fetcher).start("p1", 0).await;

        assert_eq!(fetcher.total_calls(), 0);
        assert_eq!(stats.depth_exhausted, 1);
        assert_eq!(stats.tasks(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_depth_one_fetches_only_seed() {
        let fetcher = Arc::new(scenario());
        let stats = crawler(&fetcher).start("p1", 1).await;

        assert_eq!(fetcher.fetched(), set(&["p1"]));
        // Both children were scheduled and retired without fetching
        assert_eq!(stats.depth_exhausted, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_depth_two_stops_before_grandchildren() {
        let fetcher = Arc::new(scenario());
        crawler(&fetcher).start("p1", 2).await;

        assert_eq!(fetcher.fetched(), set(&["p1", "p2", "p3"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_scenario_each_page_fetched_once() {
        let fetcher = Arc::new(scenario());
        let stats = crawler(&fetcher).start("p1", 3).await;

        assert_eq!(fetcher.fetched(), set(&["p1", "p2", "p3", "p4"]));
        for page in ["p1", "p2", "p3", "p4"] {
            assert_eq!(fetcher.calls(page), 1, "{page} fetched more than once");
        }
        // p2 -> p1 is rediscovered with budget left and ends as a duplicate
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.pages_fetched, 4);
        assert_eq!(stats.urls_visited, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_converging_paths_fetch_once() {
        // Many parents all link to the same hub, and to each other
        let parents: Vec<String> = (0..50).map(|i| format!("parent-{i}")).collect();
        let mut graph: Vec<(String, Vec<String>)> = parents
            .iter()
            .map(|p| {
                let mut links = vec!["hub".to_string()];
                links.extend(parents.iter().cloned());
                (p.clone(), links)
            })
            .collect();
        graph.push(("root".to_string(), parents.clone()));
        graph.push(("hub".to_string(), vec!["root".to_string()]));

        let fetcher = GraphFetcher {
            pages: graph.into_iter().collect(),
            delay: Some(Duration::from_millis(5)),
            ..GraphFetcher::default()
        };
        let fetcher = Arc::new(fetcher);
        crawler(&fetcher).start("root", 4).await;

        assert_eq!(fetcher.calls("hub"), 1);
        assert_eq!(fetcher.calls("root"), 1);
        for parent in &parents {
            assert_eq!(fetcher.calls(parent), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_start_waits_for_slow_fetch() {
        struct Slow {
            done: Arc<AtomicBool>,
        }

        #[async_trait]
        impl Fetcher for Slow {
            async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
                tokio::time::sleep(Duration::from_millis(200)).await;
                self.done.store(true, Ordering::SeqCst);
                Ok(String::new())
            }
        }

        let done = Arc::new(AtomicBool::new(false));
        let crawler = Crawler::new(Slow { done: done.clone() }, CrawlerConfig::default());

        let started = Instant::now();
        crawler.start("https://slow.example", 1).await;

        assert!(done.load(Ordering::SeqCst));
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_start_waits_for_slow_descendants() {
        let fetcher = Arc::new(
            GraphFetcher::new(&[("a", &["b"]), ("b", &["c"]), ("c", &[])])
                .delayed(Duration::from_millis(50)),
        );
        crawler(&fetcher).start("a", 3).await;

        // Nothing still running once start returned
        assert_eq!(fetcher.fetched(), set(&["a", "b", "c"]));
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_branch_does_not_stop_siblings() {
        let fetcher = Arc::new(
            GraphFetcher::new(&[
                ("root", &["a", "b"]),
                ("a", &["a-child"]),
                ("b", &["b-child-1", "b-child-2"]),
                ("a-child", &[]),
                ("b-child-1", &[]),
                ("b-child-2", &[]),
            ])
            .failing("a"),
        );
        let stats = crawler(&fetcher).start("root", 3).await;

        assert_eq!(fetcher.calls("b-child-1"), 1);
        assert_eq!(fetcher.calls("b-child-2"), 1);
        assert_eq!(fetcher.calls("a"), 1);
        assert_eq!(fetcher.calls("a-child"), 0);
        assert_eq!(stats.fetch_failures, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_seed_still_completes() {
        let fetcher = Arc::new(GraphFetcher::new(&[]).failing("seed"));
        let stats = crawler(&fetcher).start("seed", 5).await;

        assert_eq!(fetcher.calls("seed"), 1);
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(stats.tasks(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_self_link_not_refetched() {
        let fetcher = Arc::new(GraphFetcher::new(&[("loop", &["loop", "loop"])]));
        let stats = crawler(&fetcher).start("loop", 100).await;

        assert_eq!(fetcher.calls("loop"), 1);
        assert_eq!(stats.duplicates, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_independent_crawls_do_not_share_visited() {
        let fetcher = Arc::new(scenario().delayed(Duration::from_millis(10)));
        let crawler = crawler(&fetcher);

        let (first, second) = tokio::join!(crawler.start("p1", 3), crawler.start("p1", 3));

        assert_eq!(first.pages_fetched, 4);
        assert_eq!(second.pages_fetched, 4);
        assert_eq!(fetcher.calls("p1"), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_one_event_per_task() {
        let fetcher = Arc::new(scenario());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let crawler = crawler(&fetcher).with_events(tx);

        let stats = crawler.start("p1", 2).await;
        drop(crawler);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), stats.tasks());
        let seed = events.iter().find(|e| e.url == "p1" && e.depth == 2).unwrap();
        assert_eq!(seed.outcome, TaskOutcome::Expanded { links: 2 });
        // p2 rediscovers p1 with no budget left
        assert!(events
            .iter()
            .any(|e| e.url == "p1" && e.depth == 0 && e.outcome == TaskOutcome::DepthExhausted));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_max_concurrency_bounds_fetches() {
        let links: Vec<String> = (0..20).map(|i| format!("leaf-{i}")).collect();
        let mut pages: HashMap<String, Vec<String>> =
            links.iter().map(|l| (l.clone(), Vec::new())).collect();
        pages.insert("root".to_string(), links);

        let fetcher = Arc::new(GraphFetcher {
            pages,
            delay: Some(Duration::from_millis(10)),
            ..GraphFetcher::default()
        });
        let config = CrawlerConfig {
            max_concurrency: Some(2),
            ..CrawlerConfig::default()
        };
        let stats = Crawler::new(Shared(fetcher.clone()), config)
            .start("root", 2)
            .await;

        assert_eq!(stats.pages_fetched, 21);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_zero_concurrency_is_unbounded() {
        let fetcher = Arc::new(scenario());
        let config = CrawlerConfig {
            max_concurrency: Some(0),
            ..CrawlerConfig::default()
        };
        let crawler = Crawler::new(Shared(fetcher.clone()), config);

        let stats = tokio::time::timeout(Duration::from_secs(5), crawler.start("p1", 3))
            .await
            .expect("crawl with a zero limit should still finish");
        assert_eq!(stats.pages_fetched, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_oversized_concurrency_is_capped() {
        let fetcher = Arc::new(scenario());
        let config: CrawlerConfig =
            serde_json::from_str(r#"{"maxConcurrency": 18446744073709551615}"#).unwrap();
        let stats = Crawler::new(Shared(fetcher.clone()), config)
            .start("p1", 3)
            .await;

        assert_eq!(stats.pages_fetched, 4);
    }

    #[test]
    fn test_fetch_limiter_bounds() {
        assert!(fetch_limiter(None).is_none());
        assert!(fetch_limiter(Some(0)).is_none());
        let capped = fetch_limiter(Some(usize::MAX)).unwrap();
        assert_eq!(capped.available_permits(), Semaphore::MAX_PERMITS);
        assert_eq!(fetch_limiter(Some(3)).unwrap().available_permits(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panicking_fetch_still_retires() {
        // Panics on one URL, serves the rest from the graph
        struct PanicOn {
            url: &'static str,
            graph: Arc<GraphFetcher>,
        }

        #[async_trait]
        impl Fetcher for PanicOn {
            async fn fetch(&self, url: &str) -> Result<String, FetchError> {
                if url == self.url {
                    panic!("fetcher blew up on {url}");
                }
                self.graph.fetch(url).await
            }
        }

        let graph = Arc::new(GraphFetcher::new(&[
            ("root", &["boom", "a", "b"]),
            ("a", &["a-child"]),
            ("b", &[]),
            ("a-child", &[]),
        ]));
        let crawler = Crawler::new(
            PanicOn {
                url: "boom",
                graph: graph.clone(),
            },
            CrawlerConfig::default(),
        );

        let stats = tokio::time::timeout(Duration::from_secs(5), crawler.start("root", 3))
            .await
            .expect("crawl should finish despite a panicking task");

        assert_eq!(graph.fetched(), set(&["root", "a", "b", "a-child"]));
        // The panicking task never reports an outcome
        assert_eq!(stats.pages_fetched, 4);
        assert_eq!(stats.urls_visited, 5);
    }
}
