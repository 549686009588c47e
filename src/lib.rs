//! Read Through - an in-memory read-through cache with stampede protection
//!
//! Concurrent misses for the same key share a single computation, and values
//! live in a pluggable backend. The bundled backend is bounded, expires entries
//! after a fixed TTL and evicts the least recently used entry when full.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use read_through::{Cache, Context};
//!
//! # async fn example() -> read_through::Result<()> {
//! let cache: Cache<String> = Cache::bounded_expiring(1000, Duration::from_secs(60))
//!     .expect("non-zero capacity");
//!
//! let profile = cache
//!     .get(&Context::background(), "user:42", |_ctx| async {
//!         Ok("expensive lookup".to_string())
//!     })
//!     .await?;
//! # let _ = profile;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod flight;
pub mod lookup;
pub mod storage;
pub mod tasks;

pub use cache::{BoundedStorage, CacheStats};
pub use config::Config;
pub use context::Context;
pub use error::{CacheError, ConfigError, ProducerError, Result, StorageError};
pub use lookup::Cache;
pub use storage::{Storage, StoredValue};
pub use tasks::spawn_cleanup_task;
