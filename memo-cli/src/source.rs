//! Simulated signing-key source used by the demonstrations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Failure of the simulated upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySourceError {
    #[error("key '{0}' is unavailable upstream")]
    Unavailable(String),
}

/// Slow, countable stand-in for a JWKS endpoint.
///
/// Each successful fetch returns a new version of the key material, so a
/// caller can tell a cached value from a fresh one.
#[derive(Debug)]
pub struct SimulatedKeySource {
    delay: Duration,
    failing_prefix: Option<String>,
    fetches: AtomicUsize,
}

impl SimulatedKeySource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failing_prefix: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Fetches of keys starting with `prefix` fail.
    pub fn failing(mut self, prefix: impl Into<String>) -> Self {
        self.failing_prefix = Some(prefix.into());
        self
    }

    pub fn fetch(&self, kid: &str) -> Result<String, KeySourceError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            target: crate::logging::TARGET,
            kid,
            fetch = n,
            "fetching key from upstream"
        );

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        match &self.failing_prefix {
            Some(prefix) if kid.starts_with(prefix.as_str()) => {
                Err(KeySourceError::Unavailable(kid.to_string()))
            }
            _ => Ok(format!("{}:key-material-v{}", kid, n)),
        }
    }

    /// Number of fetches attempted so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}
