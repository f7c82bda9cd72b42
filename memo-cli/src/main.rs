//! memo CLI
//!
//! Demonstrates the lookup-deduplicating cache against a simulated key source.

mod logging;
mod source;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::task::JoinSet;
use tracing::info;

use memo_cache::DedupCache;
use memo_core::CacheConfig;

use crate::source::{KeySourceError, SimulatedKeySource};

type KeyCache = DedupCache<String, KeySourceError>;

/// memo - lookup-deduplicating TTL cache
#[derive(Parser)]
#[command(name = "memo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log JSON lines (production mode)
    #[arg(long, global = true)]
    json: bool,

    /// JSON config file; MEMO_CACHE_* variables still override it
    #[arg(short, long, global = true, env = "MEMO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Many concurrent callers miss the same key at once
    Stampede {
        /// Key every caller asks for
        #[arg(short, long, default_value = "shared-key")]
        key: String,
        /// Number of concurrent callers
        #[arg(short = 'n', long, default_value = "50")]
        callers: usize,
        /// Simulated upstream latency
        #[arg(long, default_value = "20")]
        delay_ms: u64,
    },

    /// Walk an entry through population, hit, and expiry
    Expiry {
        /// Key to look up
        #[arg(short, long, default_value = "x")]
        key: String,
        /// Entry time-to-live (overrides config)
        #[arg(long, default_value = "100")]
        ttl_ms: u64,
    },

    /// Show that failed lookups are not cached
    Failure {
        /// Key whose upstream fetch fails
        #[arg(short, long, default_value = "bad")]
        key: String,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    let config = load_config(cli.config.as_deref())?;
    info!(target: logging::TARGET, config = %config, "configuration loaded");

    match cli.command {
        Commands::Stampede {
            key,
            callers,
            delay_ms,
        } => cmd_stampede(&config, &key, callers, delay_ms).await,
        Commands::Expiry { key, ttl_ms } => cmd_expiry(&config, &key, ttl_ms).await,
        Commands::Failure { key } => cmd_failure(&config, &key).await,
        Commands::Config => cmd_config(&config),
    }
}

/// File (if given) then environment overrides.
fn load_config(path: Option<&Path>) -> Result<CacheConfig> {
    let config = match path {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?
            .with_env()
            .context("Invalid MEMO_CACHE_* override")?,
        None => CacheConfig::from_env().context("Invalid MEMO_CACHE_* configuration")?,
    };
    Ok(config)
}

fn build_cache(
    config: &CacheConfig,
    source: &Arc<SimulatedKeySource>,
    ttl: Option<Duration>,
) -> Result<Arc<KeyCache>> {
    let upstream = source.clone();
    let mut builder = DedupCache::builder()
        .lookup(move |kid: &str| upstream.fetch(kid))
        .config(config);
    if let Some(ttl) = ttl {
        builder = builder.ttl(ttl);
    }
    let cache = builder.build().context("Failed to build cache")?;
    Ok(Arc::new(cache))
}

/// Runs a possibly blocking `get` off the async worker threads.
async fn get_blocking(cache: &Arc<KeyCache>, key: &str) -> Result<Result<String, KeySourceError>> {
    let cache = cache.clone();
    let key = key.to_string();
    tokio::task::spawn_blocking(move || cache.get(&key))
        .await
        .context("Cache task panicked")
}

/// Concurrent callers on an empty cache
async fn cmd_stampede(config: &CacheConfig, key: &str, callers: usize, delay_ms: u64) -> Result<()> {
    if callers == 0 {
        bail!("--callers must be at least 1");
    }

    println!(
        "{} {} callers on '{}' (upstream latency {}ms, lock scope {})",
        "🐘 Stampede:".cyan().bold(),
        callers,
        key,
        delay_ms,
        config.lock_scope
    );

    let source = Arc::new(SimulatedKeySource::new(Duration::from_millis(delay_ms)));
    let cache = build_cache(config, &source, None)?;

    let start = Instant::now();
    let mut tasks = JoinSet::new();
    for _ in 0..callers {
        let cache = cache.clone();
        let key = key.to_string();
        tasks.spawn_blocking(move || cache.get(&key));
    }

    let mut values = HashSet::new();
    let mut failures = 0usize;
    while let Some(result) = tasks.join_next().await {
        match result.context("Caller task panicked")? {
            Ok(value) => {
                values.insert(value);
            }
            Err(_) => failures += 1,
        }
    }
    let elapsed = start.elapsed();

    println!("\n{}", "📈 Results:".green().bold());
    println!("   Upstream fetches: {}", source.fetches());
    println!("   Distinct values:  {}", values.len());
    println!("   Failed callers:   {}", failures);
    println!("   Elapsed:          {:?}", elapsed);

    if source.fetches() == 1 && values.len() == 1 && failures == 0 {
        println!("   {} One fetch served every caller", "✅".green());
    } else {
        println!("   {} Expected a single fetch", "❌".red());
    }

    println!("\n{}", "Stats (JSON):".yellow().bold());
    println!("{}", serde_json::to_string_pretty(&cache.stats())?);

    Ok(())
}

/// Population, hit, and expiry timeline
async fn cmd_expiry(config: &CacheConfig, key: &str, ttl_ms: u64) -> Result<()> {
    let ttl = Duration::from_millis(ttl_ms);
    println!("{} '{}' with ttl {:?}", "⏱  Expiry:".cyan().bold(), key, ttl);

    let source = Arc::new(SimulatedKeySource::new(Duration::ZERO));
    let cache = build_cache(config, &source, Some(ttl))?;

    let steps = [Duration::ZERO, ttl / 2, ttl + ttl / 2];
    let start = Instant::now();
    for at in steps {
        let now = start.elapsed();
        if at > now {
            tokio::time::sleep(at - now).await;
        }
        let value = get_blocking(&cache, key).await??;
        println!(
            "   t={:>5}ms  {}  (upstream fetches: {})",
            start.elapsed().as_millis(),
            value,
            source.fetches()
        );
    }

    Ok(())
}

/// Failed lookups are retried, not cached
async fn cmd_failure(config: &CacheConfig, key: &str) -> Result<()> {
    println!("{} '{}'", "💥 Failure:".cyan().bold(), key);

    let source = Arc::new(SimulatedKeySource::new(Duration::ZERO).failing(key));
    let cache = build_cache(config, &source, None)?;

    for attempt in 1..=2 {
        match get_blocking(&cache, key).await? {
            Ok(value) => println!("   attempt {}: {} {}", attempt, "unexpected value".red(), value),
            Err(err) => println!("   attempt {}: {}", attempt, err.to_string().yellow()),
        }
    }

    println!("   Upstream fetches: {}", source.fetches());
    if source.fetches() == 2 && cache.is_empty() {
        println!("   {} Failure was not cached", "✅".green());
    }

    Ok(())
}

/// Print effective config
fn cmd_config(config: &CacheConfig) -> Result<()> {
    println!("{}", "⚙️  Effective configuration:".cyan().bold());
    for field in config.fields() {
        println!("   {}", field);
    }
    println!("\n{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
