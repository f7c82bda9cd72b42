//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lifetime counters, shared with the sweeper thread.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    lookups: AtomicU64,
    lookup_failures: AtomicU64,
    sweeps: AtomicU64,
    swept_entries: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lookup_failure(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sweep(&self, removed: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.swept_entries.fetch_add(removed as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_entries: usize, expired_entries: usize) -> CacheStats {
        CacheStats {
            total_entries,
            expired_entries,
            valid_entries: total_entries.saturating_sub(expired_entries),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            swept_entries: self.swept_entries.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries physically present (including expired)
    pub total_entries: usize,
    /// Entries past their expiry, awaiting a sweep
    pub expired_entries: usize,
    /// Entries that a `get` would return
    pub valid_entries: usize,
    /// `get` calls answered from a committed entry
    pub hits: u64,
    /// `get` calls that had to populate
    pub misses: u64,
    /// Lookup function invocations
    pub lookups: u64,
    /// Lookup function invocations that returned an error
    pub lookup_failures: u64,
    /// Sweeps run, manual or background
    pub sweeps: u64,
    /// Entries removed by sweeps
    pub swept_entries: u64,
}

impl CacheStats {
    /// Fraction of `get` calls served without a lookup, `0.0` before any call.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
