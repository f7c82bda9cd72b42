//! Cache configuration.
//!
//! A [`CacheConfig`] can be built in code, read from a JSON file, and
//! overridden from the environment (`MEMO_CACHE_*`, `.env` honoured).

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_GRACE_PERIOD_MS, DEFAULT_TTL_MS, ENV_CLEANUP_INTERVAL_MS,
    ENV_GRACE_PERIOD_MS, ENV_LOCK_SCOPE, ENV_TTL_MS,
};
use crate::error::{MemoError, Result};

/// Scope of the exclusive section held while an entry is populated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockScope {
    /// One mutex serializes every population in the cache.
    ///
    /// Distinct keys cannot populate in parallel. Fine for a handful of
    /// fast lookups.
    #[default]
    Global,
    /// One mutex per key being populated; distinct keys populate in parallel.
    PerKey,
}

impl LockScope {
    /// Stable lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            LockScope::Global => "global",
            LockScope::PerKey => "per-key",
        }
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockScope {
    type Err = MemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "global" => Ok(LockScope::Global),
            "per-key" | "per_key" | "perkey" => Ok(LockScope::PerKey),
            other => Err(MemoError::InvalidConfig(format!(
                "unknown lock scope '{}', expected 'global' or 'per-key'",
                other
            ))),
        }
    }
}

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a populated entry, in milliseconds. Zero disables caching.
    pub ttl_ms: u64,
    /// Interval between background sweeps, in milliseconds. Must be positive.
    pub cleanup_interval_ms: u64,
    /// Extra time an expired entry may stay in memory before a sweep drops it.
    pub grace_period_ms: u64,
    /// Scope of the population lock.
    pub lock_scope: LockScope,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            lock_scope: LockScope::Global,
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by `MEMO_CACHE_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::default().with_env()
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| MemoError::ConfigLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| MemoError::ConfigLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `MEMO_CACHE_*` environment overrides on top of `self`.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|name| std::env::var(name).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = var(ENV_TTL_MS) {
            self.ttl_ms = parse_millis(ENV_TTL_MS, &v)?;
        }
        if let Some(v) = var(ENV_CLEANUP_INTERVAL_MS) {
            self.cleanup_interval_ms = parse_millis(ENV_CLEANUP_INTERVAL_MS, &v)?;
        }
        if let Some(v) = var(ENV_GRACE_PERIOD_MS) {
            self.grace_period_ms = parse_millis(ENV_GRACE_PERIOD_MS, &v)?;
        }
        if let Some(v) = var(ENV_LOCK_SCOPE) {
            self.lock_scope = v.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks that the configuration can build a cache.
    pub fn validate(&self) -> Result<()> {
        if self.cleanup_interval_ms == 0 {
            return Err(MemoError::InvalidConfig(
                "cleanup_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Entry time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Sweep interval.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Sweep grace period.
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// `key=value` pairs for structured logging.
    pub fn fields(&self) -> Vec<String> {
        vec![
            format!("ttl_ms={}", self.ttl_ms),
            format!("cleanup_interval_ms={}", self.cleanup_interval_ms),
            format!("grace_period_ms={}", self.grace_period_ms),
            format!("lock_scope={}", self.lock_scope),
        ]
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields().join(" "))
    }
}

fn parse_millis(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| MemoError::InvalidConfig(format!("{}='{}': {}", name, raw, e)))
}
