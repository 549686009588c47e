//! Cache Store Module
//!
//! Bounded storage engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::error::{ConfigError, StorageError};

// == Cache Store ==
/// Single-threaded store with a fixed capacity and a fixed ttl.
///
/// Callers needing shared access wrap it in a lock, see
/// [`BoundedStorage`](crate::cache::BoundedStorage).
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// How long an entry stays visible after it was written
    ttl: Duration,
}

impl<T: Clone> CacheStore<T> {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity and ttl.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be non-zero
    /// * `ttl` - Lifetime of each entry, measured from its last write
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(Self {
            entries: HashMap::with_capacity(capacity.min(1024)),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            capacity,
            ttl,
        })
    }

    // == Set ==
    /// Stores a value under `key`.
    ///
    /// An existing key has its value replaced, its ttl clock restarted and
    /// becomes most recently used. A new key that would exceed capacity evicts
    /// the least recently used entry first.
    pub fn set(&mut self, key: &str, value: T) -> Result<(), StorageError> {
        self.set_at(key, value, Instant::now())
    }

    /// [`set`](Self::set) against an explicit clock reading.
    pub fn set_at(&mut self, key: &str, value: T, now: Instant) -> Result<(), StorageError> {
        let is_overwrite = self.entries.contains_key(key);

        if !is_overwrite && self.entries.len() >= self.capacity {
            match self.lru.evict_oldest() {
                Some(evicted_key) => {
                    self.entries.remove(&evicted_key);
                    self.stats.record_eviction();
                }
                None => {
                    return Err(StorageError::Rejected(
                        "store is full and nothing can be evicted".to_string(),
                    ));
                }
            }
        }

        let entry = CacheEntry::written_at(value, self.ttl, now);
        self.entries.insert(key.to_string(), entry);
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed and counted as misses. A hit marks the key
    /// as most recently used but leaves its expiry untouched.
    pub fn get(&mut self, key: &str) -> Option<T> {
        self.get_at(key, Instant::now())
    }

    /// [`get`](Self::get) against an explicit clock reading.
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<T> {
        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired_at(now) {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        let value = entry.value.clone();
        self.lru.touch(key);
        self.stats.record_hit();
        Some(value)
    }

    // == Purge Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// [`purge_expired`](Self::purge_expired) against an explicit clock reading.
    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        let count = expired_keys.len();
        self.stats.record_expirations(count as u64);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Stats ==
    /// Returns current store statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Number of resident entries, expired-but-unpurged ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
