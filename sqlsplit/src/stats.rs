//! Router counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statement counters for one router instance.
#[derive(Debug, Default)]
pub struct RouterStats {
    /// Statements routed, total.
    pub queries: AtomicU64,
    /// Statements routed to the primary.
    pub master: AtomicU64,
    /// Statements routed to a replica.
    pub slave: AtomicU64,
    /// Session commands fanned out to all backends.
    pub all: AtomicU64,
    /// Write-conflict retries performed.
    pub conflict_retries: AtomicU64,
    /// Replica selections that fell back to the primary.
    pub fallbacks: AtomicU64,
}

impl RouterStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
