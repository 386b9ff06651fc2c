// src/report.rs
// =============================================================================
// Prints what a crawl did, either as a table or as JSON.
//
// The engine only emits events; this is where the binary turns them into
// something a person (or a CI script, with --json) can read.
// =============================================================================

use anyhow::Result;
use link_crawler::{CrawlEvent, CrawlStats, TaskOutcome};

// Longest URL shown in the table before truncating
const URL_WIDTH: usize = 57;

/// Prints the events as a table or JSON, followed by a summary.
pub fn print_results(events: &[CrawlEvent], stats: &CrawlStats, json: bool) -> Result<()> {
    if json {
        // Only tasks that actually fetched something are interesting here
        let fetched: Vec<_> = events.iter().filter(|e| e.outcome.fetched()).collect();
        let json_output = serde_json::to_string_pretty(&fetched)?;
        println!("{}", json_output);
        // stdout stays pure JSON
        eprintln!("{}", timing_line(stats));
    } else {
        print_table(events);
        print_summary(stats);
    }
    Ok(())
}

fn print_table(events: &[CrawlEvent]) {
    println!("{:<60} {:<7} {:<15} {:<30}", "URL", "DEPTH", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(112));

    for event in events.iter().filter(|e| e.outcome.fetched()) {
        let (status, message) = match &event.outcome {
            TaskOutcome::Expanded { links } => ("✅ FETCHED", format!("{} link(s)", links)),
            TaskOutcome::FetchFailed { error } => ("❌ FAILED", error.clone()),
            TaskOutcome::Duplicate | TaskOutcome::DepthExhausted => continue,
        };

        println!(
            "{:<60} {:<7} {:<15} {:<30}",
            truncate_url(&event.url),
            event.depth,
            status,
            message
        );
    }

    println!();
}

fn print_summary(stats: &CrawlStats) {
    println!("📊 Summary:");
    println!("   ✅ Fetched: {}", stats.pages_fetched);
    println!("   ❌ Failed: {}", stats.fetch_failures);
    println!("   🔁 Duplicates skipped: {}", stats.duplicates);
    println!("   📏 Depth exhausted: {}", stats.depth_exhausted);
    println!("{}", timing_line(stats));
}

fn timing_line(stats: &CrawlStats) -> String {
    format!("Crawling completed in {:?}", stats.elapsed)
}

fn truncate_url(url: &str) -> String {
    if url.chars().count() > URL_WIDTH {
        let head: String = url.chars().take(URL_WIDTH).collect();
        format!("{}...", head)
    } else {
        url.to_string()
    }
}
