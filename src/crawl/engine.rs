// src/crawl/engine.rs
// =============================================================================
// The crawl engine: a pool of workers pulling from one shared queue.
//
// How a target flows through a worker:
// 1. mailto: links are recorded as email addresses and never fetched
// 2. The URL is inserted into the visited set. If it was already there,
//    some other worker has it covered and we drop the target
// 3. The page is fetched
//    - failure -> a BrokenEntry (unless the status code is configured OK)
//    - success -> if it's on the seed's domain and is HTML/plain text,
//      extract its links, resolve them and queue the ones not yet visited
// 4. task_done() tells the queue this target is finished
//
// The crawl ends when the queue reports it is drained (see queue.rs).
//
// Shared state:
// - visited: Mutex<HashSet>. HashSet::insert() returns false when the value
//   was already present, so "check and mark" is one call under one lock.
//   Two workers can never both win the insert for the same URL. Keys are
//   the parsed form of the URL, so "http://host" and "http://host/" meet.
// - broken / mailto: Mutex-guarded collections, only appended to
//
// Rust concepts:
// - Arc: Shares one Crawler between all worker tasks
// - JoinSet: Spawns the workers and waits for all of them
// - catch_unwind: A panicking target must not take its worker down
// =============================================================================

use super::queue::{CrawlTarget, WorkQueue};
use super::scope::{canonical, domain_of, domain_of_str, mailto_addresses, resolve_link};
use crate::checker::{build_client, extract_links, fetch_page, BrokenEntry, FetchError, FetchResult};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use futures::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

// How often an idle worker re-checks the queue if nobody wakes it
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// What a finished crawl hands to the report builder
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Number of distinct URLs fetched
    pub checked: usize,
    /// Email addresses found in mailto: links
    pub mailto: BTreeSet<String>,
    /// Broken links in the order they were found
    pub broken: Vec<BrokenEntry>,
}

pub struct Crawler {
    seed: CrawlTarget,
    seed_domain: String,
    config: Config,
    client: Client,
    queue: WorkQueue,
    visited: Mutex<HashSet<String>>,
    broken: Mutex<Vec<BrokenEntry>>,
    mailto: Mutex<BTreeSet<String>>,
}

impl Crawler {
    // Prepares a crawl of `seed`
    //
    // The seed must be an absolute URL with a host; its host (and port)
    // becomes the crawl's domain.
    pub fn new(seed: &str, config: Config) -> Result<Self> {
        let seed_url = Url::parse(seed).map_err(|e| anyhow!("Invalid URL '{}': {}", seed, e))?;
        if seed_url.host_str().is_none() {
            return Err(anyhow!("URL has no host: {}", seed));
        }

        let client = build_client(config.fetch_timeout()).context("Failed to create HTTP client")?;

        Ok(Self {
            seed: CrawlTarget::seed(seed),
            seed_domain: domain_of(&seed_url),
            config,
            client,
            queue: WorkQueue::new(),
            visited: Mutex::new(HashSet::new()),
            broken: Mutex::new(Vec::new()),
            mailto: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn seed_domain(&self) -> &str {
        &self.seed_domain
    }

    // Runs the crawl to completion
    //
    // There is no deadline: each fetch has its own timeout and the crawl
    // ends when there is nothing left to do.
    pub async fn run(self) -> CrawlSummary {
        info!(
            seed = %self.seed.url,
            domain = %self.seed_domain,
            workers = self.config.worker_count,
            "starting crawl"
        );

        let crawler = Arc::new(self);
        crawler.queue.push(crawler.seed.clone());

        let mut workers = JoinSet::new();
        for id in 0..crawler.config.worker_count {
            workers.spawn(worker(Arc::clone(&crawler), id));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "crawl worker stopped unexpectedly");
            }
        }

        let summary = crawler.summary();
        info!(
            checked = summary.checked,
            broken = summary.broken.len(),
            emails = summary.mailto.len(),
            "crawl finished"
        );
        summary
    }

    // Handles one target from the queue
    async fn process(&self, target: CrawlTarget) {
        if let Some(addresses) = mailto_addresses(&target.url) {
            debug!(url = %target.url, "recording mailto link");
            lock(&self.mailto).extend(addresses);
            return;
        }

        if !self.mark_visited(&target.url) {
            debug!(url = %target.url, "already visited, skipping");
            return;
        }

        info!(url = %target.url, "checking");

        match fetch_page(&self.client, &target).await {
            Ok(page) => {
                let queued = self.discover_links(&page);
                if queued > 0 {
                    debug!(
                        url = %page.url,
                        queued,
                        pending = self.queue.len(),
                        outstanding = self.queue.outstanding(),
                        "queued new links"
                    );
                }
            }
            Err(err) => self.record_failure(&target, err),
        }
    }

    // Atomically checks and marks a URL as visited
    //
    // Returns true only for the first caller with this URL.
    fn mark_visited(&self, url: &str) -> bool {
        lock(&self.visited).insert(canonical(url))
    }

    fn is_visited(&self, url: &str) -> bool {
        lock(&self.visited).contains(&canonical(url))
    }

    // Queues the links of a fetched page
    //
    // Only pages on the seed's domain with HTML or plain-text content are
    // mined. Links to other domains are still queued (so they get checked),
    // but their own pages are never mined.
    //
    // Returns how many targets were queued.
    fn discover_links(&self, page: &FetchResult) -> usize {
        if !page.is_text_like || domain_of_str(&page.url) != self.seed_domain {
            return 0;
        }

        let Ok(base) = Url::parse(&page.url) else {
            return 0;
        };

        let mut queued = 0;
        for raw in extract_links(&page.body, &self.config) {
            let url = resolve_link(&base, &raw);

            // Cheap pre-filter. mark_visited() is still the real gate, since
            // another worker may fetch this URL before our target is popped.
            if self.is_visited(&url) {
                continue;
            }

            self.queue.push(CrawlTarget::new(url, page.url.as_str()));
            queued += 1;
        }

        queued
    }

    fn record_failure(&self, target: &CrawlTarget, err: FetchError) {
        let status = err.status_code();
        if self.config.is_ok_status(status) {
            debug!(url = %target.url, status, "status configured as OK, not reporting");
            return;
        }

        warn!(url = %target.url, parent = %target.parent, status, error = %err, "broken link");
        lock(&self.broken).push(err.into_broken(target));
    }

    fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            checked: lock(&self.visited).len(),
            mailto: lock(&self.mailto).clone(),
            broken: lock(&self.broken).clone(),
        }
    }
}

// One worker: pull, process, repeat until the queue is drained
async fn worker(crawler: Arc<Crawler>, id: usize) {
    debug!(worker = id, "worker started");

    while let Some(target) = crawler.queue.next(POLL_INTERVAL).await {
        let url = target.url.clone();

        let outcome = AssertUnwindSafe(crawler.process(target)).catch_unwind().await;
        if let Err(panic) = outcome {
            error!(
                worker = id,
                url = %url,
                panic = panic_message(panic.as_ref()),
                "internal error while processing target"
            );
        }

        // Always, even after a panic, or the crawl would never drain
        crawler.queue.task_done();
    }

    debug!(worker = id, "worker finished");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

// The guarded collections are only ever appended to, so they stay
// consistent even if a panic poisoned the lock
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
