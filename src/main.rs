// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (RUST_LOG wins over -v/-q)
// 3. Run the crawl while collecting its per-page events
// 4. Print the results and how long the crawl took
// 5. Exit with proper code (0 = crawl ran, 2 = error before crawling)
//
// A crawl where every fetch failed still exits with 0: failures are
// reported per page, they are not a failure of the crawl itself.
// =============================================================================

mod cli;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use link_crawler::{Crawler, HttpFetcher};
use tokio::sync::mpsc;
use tracing::{debug, error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<()> {
    debug!(?cli, "CLI arguments parsed");

    let config = cli.crawler_config().context("invalid configuration")?;
    let fetcher = HttpFetcher::new(&config).context("failed to build HTTP client")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let crawler = Crawler::new(fetcher, config).with_events(tx);
    let seed = cli.seed_url.clone();

    // Drain events while the crawl runs; the channel closes once the
    // crawler and all of its tasks are gone
    let crawl = async move {
        let stats = crawler.run(&seed).await;
        drop(crawler);
        stats
    };
    let collect = async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    };

    let (stats, events) = futures::future::join(crawl, collect).await;

    report::print_results(&events, &stats, cli.json)
}
