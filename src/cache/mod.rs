//! Cache Module
//!
//! Bounded in-memory storage with TTL expiration and LRU eviction.

mod bounded;
mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use bounded::BoundedStorage;
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;
