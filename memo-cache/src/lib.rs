//! # memo Cache
//!
//! Lookup-deduplicating TTL cache for expensive keyed fetches such as
//! resolving a JWT key id to its signing key.
//!
//! On a miss the cache runs the caller's lookup function, at most once at a
//! time per key, and shares the result with every caller that was waiting on
//! it. Failed lookups are never cached. Expired entries are invisible to
//! readers and are removed by a background sweeper.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use memo_cache::DedupCache;
//!
//! let cache = DedupCache::new(
//!     |kid: &str| Ok::<_, std::io::Error>(format!("key-material-for-{}", kid)),
//!     Duration::from_secs(300),
//!     Duration::from_secs(600),
//! )?;
//!
//! assert_eq!(cache.get("kid-1")?, "key-material-for-kid-1");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod gate;
mod stats;
mod store;
mod sweeper;

pub use cache::{CacheBuilder, DedupCache};
pub use stats::CacheStats;

// Re-export the contracts from core
pub use memo_core::{lookup_fn, CacheConfig, LockScope, LookupFn, MemoError, Provider};
