//! Storage Capability
//!
//! The seam between the read-through [`Cache`](crate::Cache) and whatever keeps
//! the values. The cache treats a backend purely as a key-value oracle and never
//! looks at its eviction or expiry policy.

use std::any::Any;
use std::sync::Arc;

use crate::error::StorageError;

/// A type-erased value as held by a backend.
///
/// Erasing lets one backend be shared by caches of different value types; the
/// cache checks the concrete type when it reads a value back.
pub type StoredValue = Arc<dyn Any + Send + Sync>;

// == Storage Trait ==
/// A key-value backend usable by [`Cache`](crate::Cache).
///
/// Implementations must be safe to call from many threads at once. `get` may
/// mutate internal state (recency, lazy expiry) so it takes `&self` and relies on
/// interior locking.
pub trait Storage: Send + Sync {
    /// Returns the value for `key` if one is present and still valid.
    fn get(&self, key: &str) -> Option<StoredValue>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: StoredValue) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Option<StoredValue> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Option<StoredValue> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}
