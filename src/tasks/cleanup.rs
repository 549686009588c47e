//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from a
//! [`BoundedStorage`]. Lazy expiry on read already hides stale values; the sweep
//! only reclaims memory held by keys nobody asks for anymore.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::BoundedStorage;

/// Spawns a background task that purges expired entries every `interval`.
///
/// The task runs until aborted through the returned handle.
///
/// # Panics
/// Panics if `interval` is zero, or when called outside a Tokio runtime.
///
/// # Example
/// ```ignore
/// let storage = Arc::new(BoundedStorage::new(1000, Duration::from_secs(300))?);
/// let cleanup_handle = spawn_cleanup_task(Arc::clone(&storage), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(storage: Arc<BoundedStorage>, interval: Duration) -> JoinHandle<()> {
    assert!(!interval.is_zero(), "cleanup interval must be non-zero");

    tokio::spawn(async move {
        info!(?interval, "starting TTL cleanup task");

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = storage.purge_expired();
            if removed > 0 {
                info!(removed, "TTL cleanup removed expired entries");
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let storage = Arc::new(BoundedStorage::new(100, Duration::from_millis(50)).unwrap());
        storage.set("expire_soon", Arc::new(1u8)).unwrap();

        let handle = spawn_cleanup_task(Arc::clone(&storage), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Removed by the sweep, not by a lookup
        assert!(storage.is_empty(), "Expired entry should have been cleaned up");
        assert_eq!(storage.stats().expirations, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let storage = Arc::new(BoundedStorage::new(100, Duration::from_secs(3600)).unwrap());
        storage.set("long_lived", Arc::new(1u8)).unwrap();

        let handle = spawn_cleanup_task(Arc::clone(&storage), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(storage.len(), 1);
        assert!(storage.get("long_lived").is_some(), "Valid entry should not be removed");

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let storage = Arc::new(BoundedStorage::new(100, Duration::from_secs(1)).unwrap());

        let handle = spawn_cleanup_task(storage, Duration::from_secs(1));
        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled(), "Task should be cancelled after abort");
    }
}
