// src/page/html.rs
// =============================================================================
// This module extracts links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever, which recovers from malformed markup instead
//   of failing
//
// What we deliberately do NOT do here:
// - Resolve relative links against the page URL
// - Drop duplicates
// - Filter by scheme or domain
// Every href is handed to the engine exactly as written, in document order.
// =============================================================================

use scraper::{Html, Selector};
use tracing::warn;

// Every <a> element that carries an href attribute
const ANCHOR_SELECTOR: &str = "a[href]";

/// Extracts the `href` of every anchor element in `body`, in document order.
///
/// Duplicates and relative links are kept. Input that yields no usable
/// document simply produces an empty Vec; parsing never fails.
///
/// ```
/// let links = link_crawler::page::extract_links(r#"<a href="/a">A</a><a href="/a">again</a>"#);
/// assert_eq!(links, vec!["/a", "/a"]);
/// ```
pub fn extract_links(body: &str) -> Vec<String> {
    let selector = match Selector::parse(ANCHOR_SELECTOR) {
        Ok(selector) => selector,
        Err(e) => {
            warn!("anchor selector rejected: {e:?}");
            return Vec::new();
        }
    };

    let document = Html::parse_document(body);

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
