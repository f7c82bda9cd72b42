//! # memo Core
//!
//! Errors, configuration, and contracts shared by the memo crates.
//!
//! - **Errors**: construction and configuration failures
//! - **Config**: serde-backed [`CacheConfig`] with env and file loading
//! - **Constants**: defaults and environment variable names
//! - **Traits**: the [`Provider`] get-by-key contract and the [`LookupFn`] capability
//!
//! ## Example
//!
//! ```rust
//! use memo_core::{CacheConfig, LockScope};
//!
//! let config = CacheConfig {
//!     ttl_ms: 30_000,
//!     lock_scope: LockScope::PerKey,
//!     ..CacheConfig::default()
//! };
//! config.validate().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod traits;

// Re-export commonly used items at crate root
pub use config::{CacheConfig, LockScope};
pub use constants::*;
pub use error::{MemoError, Result};
pub use traits::*;
