// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Concurrent crawling with a fixed pool of workers
// - Same-domain restriction: only the seed's own pages are mined for links,
//   links to other sites are checked but not followed further
// - Every URL is fetched at most once
// - Failures are collected as broken entries instead of stopping the crawl
//
// Submodules:
// - queue:  the shared FIFO work queue and its termination counter
// - scope:  URL resolution, domain extraction, mailto parsing
// - engine: the Crawler itself (workers, visited set, results)
// =============================================================================

mod engine;
mod queue;
mod scope;

pub use engine::{CrawlSummary, Crawler};
pub use queue::CrawlTarget;
