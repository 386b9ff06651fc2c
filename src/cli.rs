// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Flags map onto `CrawlerConfig`. When a --config file is given it is
// loaded first and any flag passed explicitly wins over the file.
// =============================================================================

use std::path::PathBuf;

use clap::Parser;
use link_crawler::{ConfigError, CrawlerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "link-crawler",
    version,
    about = "Crawl a website concurrently up to a fixed link depth",
    long_about = "link-crawler fetches a seed page, follows every link it finds and keeps going \
                  until the depth budget is spent. Each URL is fetched at most once per crawl."
)]
pub struct Cli {
    /// URL to start crawling from
    #[arg(default_value = "https://example.com")]
    pub seed_url: String,

    /// Maximum crawl depth (default: 2)
    ///
    /// Depth 0 = fetch nothing
    /// Depth 1 = just the seed page
    /// Depth 2 = seed page + all pages it links to
    #[arg(long, short = 'd')]
    pub max_depth: Option<usize>,

    /// Cap on simultaneous fetches (default: unbounded)
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Per-request timeout in seconds (default: none)
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// JSON config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output per-page results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Log level used when RUST_LOG is not set.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Builds the crawler config: file (or defaults), then flags on top.
    pub fn crawler_config(&self) -> Result<CrawlerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => CrawlerConfig::from_file(path)?,
            None => CrawlerConfig::default(),
        };

        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        if let Some(limit) = self.max_concurrency {
            config.max_concurrency = Some(limit);
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = Some(secs);
        }
        if let Some(agent) = &self.user_agent {
            config.user_agent = agent.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
