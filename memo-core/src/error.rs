//! Error types for memo.
//!
//! Only construction and configuration fail with [`MemoError`]. Lookup
//! failures belong to the caller's lookup function and are returned by the
//! cache untouched, so they never appear here.

use thiserror::Error;

/// Result type alias using `MemoError`.
pub type Result<T> = std::result::Result<T, MemoError>;

/// Error type for cache construction and configuration.
#[derive(Debug, Error)]
pub enum MemoError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CONSTRUCTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The cache was built without a lookup function.
    #[error("Cache construction failed: no lookup function supplied")]
    MissingLookup,

    /// The sweep interval must be strictly positive.
    #[error("Cache construction failed: cleanup interval must be greater than zero")]
    InvalidCleanupInterval,

    /// The background sweeper thread could not be started.
    #[error("Failed to spawn sweeper thread: {0}")]
    SweeperSpawn(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A configuration value is out of range or unparseable.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read or decoded.
    #[error("Failed to load config from '{path}': {reason}")]
    ConfigLoad {
        /// Path of the file as given by the caller.
        path: String,
        /// Underlying I/O or JSON decode failure.
        reason: String,
    },
}

impl MemoError {
    /// Returns true if this error prevented a cache from being built.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            MemoError::MissingLookup
                | MemoError::InvalidCleanupInterval
                | MemoError::SweeperSpawn(_)
        )
    }

    /// Returns true if this error came from loading or validating configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MemoError::InvalidConfig(_) | MemoError::ConfigLoad { .. }
        )
    }
}
