// src/crawl/queue.rs
// =============================================================================
// The shared work queue that the crawl workers pull from.
//
// How it works:
// 1. push() adds a CrawlTarget to the back of a FIFO queue
// 2. Workers call next() to take targets from the front
// 3. When a worker is done with a target (and has pushed any links it
//    found), it calls task_done()
//
// Knowing when to stop:
// An empty queue is NOT enough to stop. A worker may be in the middle of a
// fetch and about to push twenty new links. So the queue counts
// "outstanding" targets: +1 on push, -1 on task_done. Because a worker
// pushes a page's links *before* calling task_done for the page, the count
// can only reach zero when the queue is empty and nobody is working.
// That is the single condition next() uses to tell workers to exit.
//
// Rust concepts:
// - Mutex<VecDeque>: A FIFO queue several tasks can share safely
// - AtomicUsize: A counter that can be updated without a lock
// - Notify: Wakes up tasks waiting for new work
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

// One unit of work: a URL to check and the page that linked to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub parent: String,
}

impl CrawlTarget {
    pub fn new(url: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent: parent.into(),
        }
    }

    // The seed is its own parent
    pub fn seed(url: &str) -> Self {
        Self::new(url, url)
    }
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<CrawlTarget>>,
    outstanding: AtomicUsize,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // Adds a target to the back of the queue
    pub fn push(&self, target: CrawlTarget) {
        // Count first, so the target is never visible while uncounted
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.lock().push_back(target);
        self.notify.notify_waiters();
    }

    // Takes the next target without waiting
    pub fn pop(&self) -> Option<CrawlTarget> {
        self.lock().pop_front()
    }

    // Waits for the next target
    //
    // Returns None once the crawl is drained. The wait is woken by push()
    // and task_done(), and also re-checks every `poll` as a fallback.
    pub async fn next(&self, poll: Duration) -> Option<CrawlTarget> {
        loop {
            // Register interest *before* checking, so a push that happens
            // between the check and the await still wakes us
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(target) = self.pop() {
                return Some(target);
            }
            if self.is_drained() {
                return None;
            }

            // Timing out is fine, we just loop and look again
            let _ = tokio::time::timeout(poll, notified).await;
        }
    }

    // Marks a target returned by next()/pop() as fully processed
    pub fn task_done(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "task_done called more often than push");
        if previous == 1 {
            // Last piece of work finished: wake idle workers so they exit
            self.notify.notify_waiters();
        }
    }

    // No queued targets and no target being processed
    pub fn is_drained(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) == 0
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    // A panic while holding the lock can't leave a VecDeque half-modified,
    // so a poisoned lock is still safe to use
    fn lock(&self) -> MutexGuard<'_, VecDeque<CrawlTarget>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why std::sync::Mutex and not tokio::sync::Mutex?
//    - We never .await while holding the lock
//    - A std Mutex is faster for short critical sections like push/pop
//    - tokio's Mutex is only needed when a lock must be held across .await
//
// 2. What is Ordering::SeqCst?
//    - Atomics need a memory ordering
//    - SeqCst is the strictest: every thread sees the operations in the
//      same order. For a counter that decides termination, that's what we want
//
// 3. What does tokio::pin! do?
//    - Some futures must not move in memory once polled
//    - pin! fixes the future in place on the stack so we can call
//      enable() on it and then .await it
// -----------------------------------------------------------------------------
