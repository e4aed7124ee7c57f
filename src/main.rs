//! TTL Cache demo
//!
//! Memoizes a slow computation in a cache built from environment
//! configuration, logs evictions, and shuts the sweeper down on exit.

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::{signal, task};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_cache::{Cache, Config, Expiration, DEFAULT_EXPIRATION};

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and register an eviction logger
/// 4. Memoize a few computations through `get_or_load`
/// 5. Wait for Ctrl+C / SIGTERM, then stop the sweeper
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        default_ttl = ?config.default_ttl,
        cleanup_interval = ?config.cleanup_interval,
        "configuration loaded"
    );

    let mut cache: Cache<u64, u64> = Cache::from_config(&config);
    cache.on_evicted(|n, value| info!(n, value, "evicted memoized value"));

    // Loaders block and hold the store's exclusive lock, so keep them off the runtime
    let store = cache.store().clone();
    task::spawn_blocking(move || -> anyhow::Result<()> {
        for n in [10, 20, 10, 30, 20] {
            let value = store
                .get_or_load(n, |&n| slow_square(n).map(|value| (value, DEFAULT_EXPIRATION)))
                .with_context(|| format!("computing square of {n}"))?;
            info!(n, value, cached = store.item_count(), "square ready");
        }
        Ok(())
    })
    .await
    .context("memoization worker panicked")??;

    // Short-lived entry to show the sweeper at work
    cache.set(0, 0, Expiration::After(Duration::from_secs(1)));

    for (n, entry) in cache.items() {
        info!(n, ttl_remaining = ?entry.ttl_remaining(), "cached");
    }

    shutdown_signal().await?;
    cache.shutdown();
    info!(remaining = cache.item_count(), "cache shut down");
    Ok(())
}

/// Stand-in for an expensive lookup.
fn slow_square(n: u64) -> anyhow::Result<u64> {
    thread::sleep(Duration::from_millis(200));
    match n.checked_mul(n) {
        Some(square) => Ok(square),
        None => bail!("square of {n} overflows"),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?;
        tokio::select! {
            res = ctrl_c => res.context("installing Ctrl+C handler")?,
            _ = terminate.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await.context("installing Ctrl+C handler")?;

    Ok(())
}
