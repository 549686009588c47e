//! Read Through - stampede demo
//!
//! Fires a burst of concurrent lookups over a handful of keys against a slow
//! producer and reports how many times the producer actually ran.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use read_through::{spawn_cleanup_task, BoundedStorage, Cache, CacheStats, Config, Context};

/// Simulated latency of the backing computation
const PRODUCER_LATENCY: Duration = Duration::from_millis(100);

/// How long each demo caller is willing to wait
const CALLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Summary printed once every caller has finished.
#[derive(Debug, Serialize)]
struct DemoReport {
    callers: usize,
    keys: usize,
    producer_invocations: usize,
    /// Successful callers that did not run the producer themselves
    shared_results: usize,
    failures: usize,
    /// Backend lookups, two per cold request
    storage: CacheStats,
    backend_hit_rate: f64,
    generated_at: String,
}

/// Entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the bounded backend and the cache over it
/// 4. Start background TTL cleanup task, unless disabled
/// 5. Run the concurrent lookups and print the report
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "read_through=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting read-through cache demo");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, ttl={:?}, cleanup_interval={:?}, callers={}, keys={}",
        config.capacity, config.ttl, config.cleanup_interval, config.demo_callers, config.demo_keys
    );

    let storage = Arc::new(BoundedStorage::from_config(&config)?);
    let cache: Cache<String> = Cache::new(Arc::clone(&storage));

    let cleanup_handle = (!config.cleanup_interval.is_zero())
        .then(|| spawn_cleanup_task(Arc::clone(&storage), config.cleanup_interval));

    let keys = config.demo_keys.max(1);
    let invocations = Arc::new(AtomicUsize::new(0));
    let mut callers = JoinSet::new();

    for i in 0..config.demo_callers {
        let cache = cache.clone();
        let invocations = Arc::clone(&invocations);
        let key = format!("item:{}", i % keys);

        callers.spawn(async move {
            let ctx = Context::background().with_timeout(CALLER_TIMEOUT);
            let producer_key = key.clone();
            cache
                .get(&ctx, &key, move |_| async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(PRODUCER_LATENCY).await;
                    Ok(format!("value for {producer_key}"))
                })
                .await
        });
    }

    let mut failures = 0;
    while let Some(joined) = callers.join_next().await {
        if let Err(err) = joined? {
            warn!(%err, "lookup failed");
            failures += 1;
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }

    let stats = storage.stats();
    let producer_invocations = invocations.load(Ordering::SeqCst);
    let report = DemoReport {
        callers: config.demo_callers,
        keys,
        producer_invocations,
        shared_results: config
            .demo_callers
            .saturating_sub(failures)
            .saturating_sub(producer_invocations),
        failures,
        backend_hit_rate: stats.hit_rate(),
        storage: stats,
        generated_at: chrono::Utc::now().to_rfc3339(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Demo complete");
    Ok(())
}
