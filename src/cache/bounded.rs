//! Bounded Storage Module
//!
//! Thread-safe [`Storage`] backend over a [`CacheStore`].

use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::error::{ConfigError, StorageError};
use crate::storage::{Storage, StoredValue};

// == Bounded Storage ==
/// A fixed-capacity, time-expiring, LRU-evicting backend.
///
/// The whole store sits behind one mutex: reads update recency and may drop
/// expired entries, so every operation mutates.
#[derive(Debug)]
pub struct BoundedStorage {
    inner: Mutex<CacheStore<StoredValue>>,
}

impl BoundedStorage {
    /// Creates a backend holding at most `capacity` entries, each live for `ttl`
    /// after its last write.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Mutex::new(CacheStore::new(capacity, ttl)?),
        })
    }

    /// Creates a backend sized from `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(config.capacity, config.ttl)
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.lock().purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.lock().ttl()
    }
}

impl Storage for BoundedStorage {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.inner.lock().get(key)
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        let mut store = self.inner.lock();
        let evictions = store.stats().evictions;
        store.set(key, value)?;
        if store.stats().evictions > evictions {
            debug!(key, "stored value evicted the least recently used entry");
        }
        Ok(())
    }
}
