//! Defaults and environment variable names for memo.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default time-to-live of a populated entry (1 hour).
pub const DEFAULT_TTL_MS: u64 = 60 * 60 * 1000;

/// Default interval between background sweeps (10 minutes).
///
/// Signing-key caches rarely hold more than a handful of entries, so an
/// infrequent sweep is enough to bound memory.
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 10 * 60 * 1000;

/// Default time an expired entry may linger before the sweeper removes it.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 0;

/// Name given to the background sweeper thread.
pub const SWEEPER_THREAD_NAME: &str = "memo-sweeper";

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT VARIABLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Overrides [`crate::CacheConfig::ttl_ms`].
pub const ENV_TTL_MS: &str = "MEMO_CACHE_TTL_MS";

/// Overrides [`crate::CacheConfig::cleanup_interval_ms`].
pub const ENV_CLEANUP_INTERVAL_MS: &str = "MEMO_CACHE_CLEANUP_INTERVAL_MS";

/// Overrides [`crate::CacheConfig::grace_period_ms`].
pub const ENV_GRACE_PERIOD_MS: &str = "MEMO_CACHE_GRACE_PERIOD_MS";

/// Overrides [`crate::CacheConfig::lock_scope`] (`global` or `per-key`).
pub const ENV_LOCK_SCOPE: &str = "MEMO_CACHE_LOCK_SCOPE";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        assert!(DEFAULT_CLEANUP_INTERVAL_MS > 0);
        assert!(DEFAULT_TTL_MS >= DEFAULT_CLEANUP_INTERVAL_MS);
    }

    #[test]
    fn test_env_names_share_prefix() {
        for name in [ENV_TTL_MS, ENV_CLEANUP_INTERVAL_MS, ENV_GRACE_PERIOD_MS, ENV_LOCK_SCOPE] {
            assert!(name.starts_with("MEMO_CACHE_"));
        }
    }
}
