//! Committed entries and their expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Cache entry with an absolute expiry.
///
/// `expires_at` is `None` when `now + ttl` overflows `Instant`, which only
/// happens for absurdly long TTLs; such entries never expire.
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_fresh_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }

    fn is_sweepable_at(&self, now: Instant, grace: Duration) -> bool {
        match self.expires_at.and_then(|at| at.checked_add(grace)) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Key to entry map.
///
/// Every write happens under the write lock with a fully built entry, so a
/// reader sees either no entry or a complete one.
pub(crate) struct EntryStore<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> EntryStore<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the value for `key` unless it is missing or expired.
    pub(crate) fn get_fresh(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let now = Instant::now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| e.is_fresh_at(now))
            .map(|e| e.value.clone())
    }

    /// Commits `value`, replacing any previous entry for `key`.
    pub(crate) fn insert(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl);
        self.entries.write().insert(key.to_string(), entry);
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drops every entry past `expires_at + grace`. Returns how many went.
    ///
    /// Staleness is judged under the write lock, the same lock a populator
    /// commits under, so a freshly written entry is never swept.
    pub(crate) fn sweep(&self, grace: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_sweepable_at(now, grace));
        before - entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `(total, expired)` entry counts.
    pub(crate) fn counts(&self) -> (usize, usize) {
        let now = Instant::now();
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| !e.is_fresh_at(now)).count();
        (entries.len(), expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let store = EntryStore::new();
        store.insert("kid-1", "pem-1".to_string(), Duration::from_secs(60));
        assert_eq!(store.get_fresh("kid-1").as_deref(), Some("pem-1"));
        assert!(store.get_fresh("kid-2").is_none());
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let store = EntryStore::new();
        store.insert("kid-1", 1u32, Duration::ZERO);
        assert!(store.get_fresh("kid-1").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expired_entry_hidden_but_present() {
        let store = EntryStore::new();
        store.insert("kid-1", 1u32, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        assert!(store.get_fresh("kid-1").is_none());
        assert_eq!(store.counts(), (1, 1));
    }

    #[test]
    fn test_sweep_removes_only_stale() {
        let store = EntryStore::new();
        store.insert("old", 1u32, Duration::from_millis(1));
        store.insert("new", 2u32, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(store.sweep(Duration::ZERO), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_fresh("new"), Some(2));
    }

    #[test]
    fn test_sweep_honours_grace() {
        let store = EntryStore::new();
        store.insert("kid-1", 1u32, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(store.sweep(Duration::from_secs(60)), 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.sweep(Duration::ZERO), 1);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let store = EntryStore::new();
        store.insert("kid-1", 1u32, Duration::MAX);
        assert_eq!(store.get_fresh("kid-1"), Some(1));
        assert_eq!(store.sweep(Duration::ZERO), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = EntryStore::new();
        store.insert("a", 1u32, Duration::from_secs(60));
        store.insert("b", 2u32, Duration::from_secs(60));

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        store.clear();
        assert_eq!(store.len(), 0);
    }
}
