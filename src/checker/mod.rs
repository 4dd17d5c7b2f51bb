// src/checker/mod.rs
// =============================================================================
// This module contains the per-page logic of the crawler.
//
// Submodules:
// - http: Fetches one URL and classifies the result (page or broken entry)
// - html: Extracts raw links from an HTML page
//
// Neither submodule knows about queues or workers; the crawl module drives
// them.
// =============================================================================

mod html;
mod http;

// Re-export public items from submodules
// This lets users write `checker::fetch_page()` instead of
// `checker::http::fetch_page()`
pub use html::extract_links;
pub use http::{build_client, fetch_page, BrokenEntry, FetchError, FetchResult};
