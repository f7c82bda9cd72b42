//! Exclusive section around check-populate-store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use memo_core::LockScope;

/// Serializes populations, either cache-wide or per key.
pub(crate) enum PopulationGate {
    Global(Mutex<()>),
    /// Slots exist only while some caller is populating or waiting on a key.
    PerKey(Mutex<HashMap<String, Slot>>),
}

/// Per-key lock and the number of callers holding or waiting on it.
pub(crate) struct Slot {
    lock: Arc<Mutex<()>>,
    holders: usize,
}

/// One caller's claim on a key's slot.
///
/// Holder counts only change under the map lock, and the release runs in
/// `Drop`, so a slot is removed exactly when its last holder leaves, even
/// if that holder is unwinding from a panicking lookup.
struct SlotLease<'a> {
    slots: &'a Mutex<HashMap<String, Slot>>,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> SlotLease<'a> {
    fn acquire(slots: &'a Mutex<HashMap<String, Slot>>, key: &'a str) -> Self {
        let mut map = slots.lock();
        let slot = map.entry(key.to_string()).or_insert_with(|| Slot {
            lock: Arc::default(),
            holders: 0,
        });
        slot.holders += 1;
        let lock = slot.lock.clone();
        drop(map);

        Self { slots, key, lock }
    }
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        let mut map = self.slots.lock();
        let last = match map.get_mut(self.key) {
            Some(slot) => {
                slot.holders = slot.holders.saturating_sub(1);
                slot.holders == 0
            }
            None => false,
        };
        if last {
            map.remove(self.key);
        }
    }
}

impl PopulationGate {
    pub(crate) fn new(scope: LockScope) -> Self {
        match scope {
            LockScope::Global => PopulationGate::Global(Mutex::new(())),
            LockScope::PerKey => PopulationGate::PerKey(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn scope(&self) -> LockScope {
        match self {
            PopulationGate::Global(_) => LockScope::Global,
            PopulationGate::PerKey(_) => LockScope::PerKey,
        }
    }

    /// Runs `f` while holding the exclusive section for `key`.
    pub(crate) fn run<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        match self {
            PopulationGate::Global(lock) => {
                let _guard = lock.lock();
                f()
            }
            PopulationGate::PerKey(slots) => {
                let lease = SlotLease::acquire(slots, key);
                // Declared after the lease so it is released first.
                let _guard = lease.lock.lock();
                f()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn open_slots(&self) -> usize {
        match self {
            PopulationGate::Global(_) => 0,
            PopulationGate::PerKey(slots) => slots.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    use test_case::test_case;

    #[test_case(LockScope::Global)]
    #[test_case(LockScope::PerKey)]
    fn test_same_key_is_exclusive(scope: LockScope) {
        let gate = PopulationGate::new(scope);
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    gate.run("kid", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_per_key_allows_distinct_keys_in_parallel() {
        let gate = PopulationGate::new(LockScope::PerKey);
        let barrier = Barrier::new(2);

        // Each thread waits for the other while inside its own key's section;
        // this would deadlock if distinct keys shared one lock.
        std::thread::scope(|s| {
            for key in ["kid-a", "kid-b"] {
                let gate = &gate;
                let barrier = &barrier;
                s.spawn(move || gate.run(key, || barrier.wait()));
            }
        });
    }

    #[test]
    fn test_per_key_slots_released() {
        let gate = PopulationGate::new(LockScope::PerKey);
        gate.run("kid-a", || ());
        gate.run("kid-b", || ());
        assert_eq!(gate.open_slots(), 0);
    }

    #[test]
    fn test_per_key_slots_released_after_panic() {
        let gate = PopulationGate::new(LockScope::PerKey);

        for i in 0..100 {
            let key = format!("kid-{}", i);
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                gate.run(&key, || panic!("lookup blew up"))
            }));
            assert!(result.is_err());
        }

        assert_eq!(gate.open_slots(), 0);
        // The key stays usable after its lookup panicked.
        assert_eq!(gate.run("kid-0", || 7), 7);
        assert_eq!(gate.open_slots(), 0);
    }

    #[test]
    fn test_per_key_slots_released_under_contention() {
        let gate = PopulationGate::new(LockScope::PerKey);
        let keys: Vec<String> = (0..8).map(|i| format!("kid-{}", i)).collect();
        let (gate, keys) = (&gate, &keys);

        std::thread::scope(|s| {
            for t in 0..16 {
                s.spawn(move || {
                    for i in 0..2000 {
                        gate.run(&keys[(t + i) % keys.len()], || ());
                    }
                });
            }
        });

        assert_eq!(gate.open_slots(), 0);
    }

    #[test]
    fn test_waiting_caller_keeps_slot_alive() {
        let gate = PopulationGate::new(LockScope::PerKey);
        let inside = Barrier::new(2);
        let (gate, inside) = (&gate, &inside);

        std::thread::scope(|s| {
            s.spawn(move || {
                gate.run("kid", || {
                    inside.wait();
                    // Give the second caller time to queue on the same slot.
                    std::thread::sleep(Duration::from_millis(20));
                })
            });
            inside.wait();
            s.spawn(move || gate.run("kid", || ()));
        });

        assert_eq!(gate.open_slots(), 0);
    }

    #[test]
    fn test_scope_reported() {
        assert_eq!(PopulationGate::new(LockScope::Global).scope(), LockScope::Global);
        assert_eq!(PopulationGate::new(LockScope::PerKey).scope(), LockScope::PerKey);
    }
}
