//! Lookup Module
//!
//! The public entry point: look a key up in the backend and, on a miss, compute it
//! exactly once no matter how many callers ask concurrently.

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::BoundedStorage;
use crate::config::Config;
use crate::context::Context;
use crate::error::{CacheError, ConfigError, Result};
use crate::flight::Flight;
use crate::storage::{Storage, StoredValue};

// == Cache ==
/// A read-through cache for values of type `V`.
///
/// Cloning is cheap and clones share both the backend and the set of in-flight
/// computations.
pub struct Cache<V> {
    storage: Arc<dyn Storage>,
    flight: Flight<Result<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            flight: self.flight.clone(),
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("value", &type_name::<V>())
            .field("flight", &self.flight)
            .finish_non_exhaustive()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Wraps any backend implementing [`Storage`].
    ///
    /// Pass an `Arc` to share one backend between several caches.
    pub fn new<S: Storage + 'static>(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
            flight: Flight::new(),
        }
    }

    /// Builds a cache over a fresh [`BoundedStorage`].
    pub fn bounded_expiring(
        capacity: usize,
        ttl: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(BoundedStorage::new(capacity, ttl)?))
    }

    /// Builds a cache over a [`BoundedStorage`] sized from `config`.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(BoundedStorage::from_config(config)?))
    }

    // == Get ==
    /// Returns the value for `key`, running `producer` to compute it on a miss.
    ///
    /// Concurrent misses for the same key share one producer run and all receive
    /// its outcome. A successful value is written to the backend before it is
    /// handed out; a failure is returned to every waiter and nothing is stored,
    /// so the next call tries again.
    ///
    /// `ctx` bounds only this caller's wait. When it is cancelled or its deadline
    /// passes the call returns at once, while the producer keeps running for the
    /// other waiters and still fills the backend. The producer receives a
    /// background context for the same reason.
    ///
    /// # Errors
    /// - [`CacheError::TypeMismatch`] if the backend holds a value that is not a `V`
    /// - [`CacheError::Producer`] with the producer's own error
    /// - [`CacheError::Storage`] if the backend refused the computed value
    /// - [`CacheError::ProducerPanicked`] if the producer panicked
    /// - [`CacheError::Cancelled`] / [`CacheError::DeadlineExceeded`] from `ctx`
    pub async fn get<F, Fut>(&self, ctx: &Context, key: &str, producer: F) -> Result<V>
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        if let Some(value) = self.storage.get(key) {
            debug!(key, "cache hit");
            return downcast(key, value);
        }

        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let storage = Arc::clone(&self.storage);
        let owned_key = key.to_string();
        let waiter = self
            .flight
            .join(key, move || populate(storage, owned_key, producer));
        debug!(key, leader = waiter.is_leader(), "cache miss");

        match ctx.run(waiter.wait()).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => Err(CacheError::ProducerPanicked {
                key: key.to_string(),
            }),
            Err(err) => {
                debug!(key, %err, "caller stopped waiting");
                Err(err)
            }
        }
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.flight.in_flight()
    }

    /// True while a computation for `key` is pending.
    pub fn is_pending(&self, key: &str) -> bool {
        self.flight.is_pending(key)
    }

    /// The backend this cache reads from and writes to.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}

/// The body of a group: re-check, compute, store.
async fn populate<V, F, Fut>(storage: Arc<dyn Storage>, key: String, producer: F) -> Result<V>
where
    V: Clone + Send + Sync + 'static,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = anyhow::Result<V>>,
{
    // Another group may have filled the key between our miss and this group starting
    if let Some(value) = storage.get(&key) {
        debug!(key = %key, "value appeared before computing");
        return downcast(&key, value);
    }

    let value = producer(Context::background())
        .await
        .map_err(|err| CacheError::Producer(err.into()))?;

    let stored: StoredValue = Arc::new(value.clone());
    if let Err(source) = storage.set(&key, stored) {
        warn!(key = %key, %source, "computed value was not stored");
        return Err(CacheError::Storage { key, source });
    }

    Ok(value)
}

fn downcast<V: Clone + 'static>(key: &str, value: StoredValue) -> Result<V> {
    value
        .downcast_ref::<V>()
        .cloned()
        .ok_or_else(|| CacheError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<V>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast_matching_type() {
        let value: StoredValue = Arc::new(42u64);
        assert_eq!(downcast::<u64>("k", value).unwrap(), 42);
    }

    #[test]
    fn test_downcast_mismatch_names_expected_type() {
        let value: StoredValue = Arc::new("text".to_string());
        match downcast::<u64>("k", value) {
            Err(CacheError::TypeMismatch { key, expected }) => {
                assert_eq!(key, "k");
                assert_eq!(expected, "u64");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Cache::<u32>::bounded_expiring(0, Duration::from_secs(1));
        assert!(matches!(result, Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn test_from_config_validates() {
        let config = Config {
            capacity: 0,
            ..Config::default()
        };
        assert!(matches!(
            Cache::<u32>::from_config(&config),
            Err(ConfigError::ZeroCapacity)
        ));
        assert!(Cache::<u32>::from_config(&Config::default()).is_ok());
    }

    #[tokio::test]
    async fn test_hit_skips_producer() {
        let storage = Arc::new(BoundedStorage::new(4, Duration::from_secs(60)).unwrap());
        storage.set("k", Arc::new(7u32)).unwrap();
        let cache: Cache<u32> = Cache::new(Arc::clone(&storage));

        let value = cache
            .get(&Context::background(), "k", |_| async {
                Err(anyhow::anyhow!("producer must not run on a hit"))
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_miss_populates_backend() {
        let cache: Cache<String> = Cache::bounded_expiring(4, Duration::from_secs(60)).unwrap();

        let value = cache
            .get(&Context::background(), "k", |_| async { Ok("v".to_string()) })
            .await
            .unwrap();

        assert_eq!(value, "v");
        let stored = cache.storage().get("k").unwrap();
        assert_eq!(stored.downcast_ref::<String>().map(String::as_str), Some("v"));
    }
}
