//! Subscriber setup for the `memo` binary.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! left to binaries like this one.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target for the binary's own events.
///
/// `EnvFilter` matches targets by prefix, so a bare `memo` directive would
/// also select any other crate whose name starts with `memo`.
pub const TARGET: &str = "memo_cli";

/// Directives used when `RUST_LOG` is unset. Every crate is named in full.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "memo_cache=debug,memo_core=debug,memo_cli=debug,info"
    } else {
        "memo_cache=info,memo_cli=info,warn"
    }
}

/// Installs the global subscriber.
///
/// `json` selects production output: one JSON object per event, no ANSI
/// colours. `RUST_LOG` takes precedence over `verbose`.
pub fn init(verbose: bool, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
        info!(target: TARGET, "logging in production mode");
    } else {
        registry.with(fmt::layer()).init();
        info!(target: TARGET, "logging in development mode");
    }
}
