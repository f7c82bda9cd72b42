//! Lookup-deduplicating TTL cache.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use memo_core::{
    CacheConfig, LockScope, LookupFn, MemoError, Provider, Result as MemoResult,
    DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_GRACE_PERIOD_MS, DEFAULT_TTL_MS,
};

use crate::gate::PopulationGate;
use crate::stats::{CacheStats, StatsCounters};
use crate::store::EntryStore;
use crate::sweeper::Sweeper;

/// Cache that populates missing keys through a lookup function, at most one
/// population per key at a time.
///
/// # Reads
///
/// A hit only takes the entry map's read lock. A miss enters the population
/// gate, re-checks the map (another caller may have populated the key while
/// this one waited), and only then calls the lookup function.
///
/// # Failures
///
/// A failed lookup stores nothing and its error is returned as-is. Callers
/// queued behind the failing one run the lookup again themselves.
///
/// # Thread Safety
///
/// `DedupCache` is `Send + Sync`; share it behind an `Arc`.
pub struct DedupCache<V, E> {
    store: Arc<EntryStore<V>>,
    stats: Arc<StatsCounters>,
    gate: PopulationGate,
    lookup: LookupFn<V, E>,
    ttl: Duration,
    grace_period: Duration,
    cleanup_interval: Duration,
    _sweeper: Sweeper,
}

impl<V, E> DedupCache<V, E>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with the global lock scope.
    ///
    /// Fails if `cleanup_interval` is zero. A zero `ttl` is accepted and
    /// means every `get` runs the lookup.
    pub fn new<F>(lookup: F, ttl: Duration, cleanup_interval: Duration) -> MemoResult<Self>
    where
        F: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::builder()
            .lookup(lookup)
            .ttl(ttl)
            .cleanup_interval(cleanup_interval)
            .build()
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(lookup: LookupFn<V, E>, config: &CacheConfig) -> MemoResult<Self> {
        Self::builder().lookup_fn(lookup).config(config).build()
    }

    /// Starts a builder with default settings and no lookup function.
    pub fn builder() -> CacheBuilder<V, E> {
        CacheBuilder::default()
    }

    /// Returns the value for `key`, running the lookup on a miss.
    ///
    /// The error, if any, is exactly what the lookup function returned.
    pub fn get(&self, key: &str) -> Result<V, E> {
        if let Some(value) = self.store.get_fresh(key) {
            self.stats.record_hit();
            trace!(key, "cache hit");
            return Ok(value);
        }

        self.gate.run(key, || self.populate(key))
    }

    /// Check-populate-store; runs inside the population gate.
    fn populate(&self, key: &str) -> Result<V, E> {
        if let Some(value) = self.store.get_fresh(key) {
            self.stats.record_hit();
            trace!(key, "populated while waiting");
            return Ok(value);
        }

        self.stats.record_miss();
        self.stats.record_lookup();
        let started = Instant::now();

        match (self.lookup)(key) {
            Ok(value) => {
                self.store.insert(key, value.clone(), self.ttl);
                debug!(
                    key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ttl_ms = self.ttl.as_millis() as u64,
                    "populated cache entry"
                );
                Ok(value)
            }
            Err(err) => {
                self.stats.record_lookup_failure();
                warn!(
                    key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "lookup failed, nothing cached"
                );
                Err(err)
            }
        }
    }

    /// Returns the value for `key` if a fresh entry exists. Never runs the lookup.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.store.get_fresh(key)
    }

    /// Drops the entry for `key`. The next `get` will run the lookup.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.store.remove(key);
        if removed {
            debug!(key, "invalidated cache entry");
        }
        removed
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Sweeps expired entries now instead of waiting for the background
    /// sweeper. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.store.sweep(self.grace_period);
        self.stats.record_sweep(removed);
        removed
    }

    /// Number of entries physically present, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if no entries are present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (total, expired) = self.store.counts();
        self.stats.snapshot(total, expired)
    }

    /// Entry time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Background sweep interval.
    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    /// Scope of the population lock.
    pub fn lock_scope(&self) -> LockScope {
        self.gate.scope()
    }
}

impl<V, E> Provider<V> for DedupCache<V, E>
where
    V: Clone + Send + Sync + 'static,
{
    type Error = E;

    fn get(&self, key: &str) -> Result<V, E> {
        DedupCache::get(self, key)
    }
}

impl<V, E> fmt::Debug for DedupCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupCache")
            .field("ttl", &self.ttl)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("grace_period", &self.grace_period)
            .field("lock_scope", &self.gate.scope())
            .field("entries", &self.store.len())
            .finish()
    }
}

/// Builder for [`DedupCache`].
pub struct CacheBuilder<V, E> {
    lookup: Option<LookupFn<V, E>>,
    ttl: Duration,
    cleanup_interval: Duration,
    grace_period: Duration,
    lock_scope: LockScope,
}

impl<V, E> Default for CacheBuilder<V, E> {
    fn default() -> Self {
        Self {
            lookup: None,
            ttl: Duration::from_millis(DEFAULT_TTL_MS),
            cleanup_interval: Duration::from_millis(DEFAULT_CLEANUP_INTERVAL_MS),
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
            lock_scope: LockScope::default(),
        }
    }
}

impl<V, E> CacheBuilder<V, E>
where
    V: Clone + Send + Sync + 'static,
{
    /// Sets the lookup function from a closure.
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
    {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// Sets an already shared lookup function.
    pub fn lookup_fn(mut self, lookup: LookupFn<V, E>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Entry time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Background sweep interval. Must be positive.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// How long past expiry an entry may linger before a sweep removes it.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Scope of the population lock.
    pub fn lock_scope(mut self, scope: LockScope) -> Self {
        self.lock_scope = scope;
        self
    }

    /// Takes every timing and locking setting from `config`.
    pub fn config(self, config: &CacheConfig) -> Self {
        self.ttl(config.ttl())
            .cleanup_interval(config.cleanup_interval())
            .grace_period(config.grace_period())
            .lock_scope(config.lock_scope)
    }

    /// Builds the cache and starts its sweeper.
    pub fn build(self) -> MemoResult<DedupCache<V, E>> {
        let lookup = self.lookup.ok_or(MemoError::MissingLookup)?;
        if self.cleanup_interval.is_zero() {
            return Err(MemoError::InvalidCleanupInterval);
        }
        if self.ttl.is_zero() {
            warn!("cache ttl is zero, every get will run the lookup");
        }

        let store = Arc::new(EntryStore::new());
        let stats = Arc::new(StatsCounters::default());
        let sweeper = Sweeper::spawn(
            Arc::downgrade(&store),
            stats.clone(),
            self.cleanup_interval,
            self.grace_period,
        )?;

        info!(
            ttl_ms = self.ttl.as_millis() as u64,
            cleanup_interval_ms = self.cleanup_interval.as_millis() as u64,
            grace_period_ms = self.grace_period.as_millis() as u64,
            lock_scope = %self.lock_scope,
            "cache created"
        );

        Ok(DedupCache {
            store,
            stats,
            gate: PopulationGate::new(self.lock_scope),
            lookup,
            ttl: self.ttl,
            grace_period: self.grace_period,
            cleanup_interval: self.cleanup_interval,
            _sweeper: sweeper,
        })
    }
}
