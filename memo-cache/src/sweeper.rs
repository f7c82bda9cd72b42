//! Background removal of expired entries.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, trace};

use memo_core::{MemoError, Result, SWEEPER_THREAD_NAME};

use crate::stats::StatsCounters;
use crate::store::EntryStore;

/// Handle to the sweeper thread. Dropping it stops the thread.
pub(crate) struct Sweeper {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Sweeps `store` every `interval` until dropped or until the store is gone.
    pub(crate) fn spawn<V>(
        store: Weak<EntryStore<V>>,
        stats: Arc<StatsCounters>,
        interval: Duration,
        grace: Duration,
    ) -> Result<Self>
    where
        V: Send + Sync + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name(SWEEPER_THREAD_NAME.into())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(store) = store.upgrade() else {
                            break;
                        };
                        let removed = store.sweep(grace);
                        stats.record_sweep(removed);
                        if removed > 0 {
                            debug!(removed, "swept expired cache entries");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| MemoError::SweeperSpawn(e.to_string()))?;

        trace!(interval_ms = interval.as_millis() as u64, "sweeper started");

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        // Disconnecting the channel wakes the thread immediately.
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_sweep() {
        let store = Arc::new(EntryStore::new());
        let stats = Arc::new(StatsCounters::default());
        store.insert("kid-1", 1u32, Duration::from_millis(1));

        let _sweeper = Sweeper::spawn(
            Arc::downgrade(&store),
            stats.clone(),
            Duration::from_millis(5),
            Duration::ZERO,
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(store.len(), 0);

        let snapshot = stats.snapshot(0, 0);
        assert!(snapshot.sweeps >= 1);
        assert_eq!(snapshot.swept_entries, 1);
    }

    #[test]
    fn test_drop_stops_thread_promptly() {
        let store = Arc::new(EntryStore::<u32>::new());
        let sweeper = Sweeper::spawn(
            Arc::downgrade(&store),
            Arc::new(StatsCounters::default()),
            Duration::from_secs(3600),
            Duration::ZERO,
        )
        .unwrap();

        let started = std::time::Instant::now();
        drop(sweeper);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_exits_when_store_dropped() {
        let store = Arc::new(EntryStore::<u32>::new());
        let stats = Arc::new(StatsCounters::default());
        let sweeper = Sweeper::spawn(
            Arc::downgrade(&store),
            stats.clone(),
            Duration::from_millis(5),
            Duration::ZERO,
        )
        .unwrap();

        drop(store);
        std::thread::sleep(Duration::from_millis(50));
        assert!(sweeper.handle.as_ref().is_some_and(|h| h.is_finished()));
    }
}
