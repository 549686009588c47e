//! Request Coalescing Module
//!
//! Deduplicates concurrent computations for the same key. The first caller for a
//! key starts the computation on its own task; everyone arriving while it runs
//! waits for that same outcome.
//!
//! The computation is detached from every caller: dropping or abandoning a
//! [`Waiter`] never cancels it, so the remaining waiters still get their result.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Pending groups by key. A receiver sees `None` until the group resolves.
type Registry<T> = Arc<Mutex<HashMap<String, watch::Receiver<Option<T>>>>>;

// == Flight ==
/// A registry of in-progress computations, at most one per key.
pub struct Flight<T> {
    groups: Registry<T>,
}

impl<T> Default for Flight<T> {
    fn default() -> Self {
        Self {
            groups: Arc::default(),
        }
    }
}

impl<T> Clone for Flight<T> {
    fn clone(&self) -> Self {
        Self {
            groups: Arc::clone(&self.groups),
        }
    }
}

impl<T> fmt::Debug for Flight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flight")
            .field("in_flight", &self.groups.lock().len())
            .finish()
    }
}

impl<T> Flight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the pending group for `key`, or starts one running `work`.
    ///
    /// `work` only runs when this call creates the group; otherwise it is dropped
    /// unused.
    ///
    /// # Panics
    /// Starting a group spawns a task, so this must be called from within a
    /// Tokio runtime.
    pub fn join<F, Fut>(&self, key: &str, work: F) -> Waiter<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut groups = self.groups.lock();
        if let Some(rx) = groups.get(key) {
            debug!(key, "joining in-flight computation");
            return Waiter {
                rx: rx.clone(),
                started: false,
            };
        }

        let (tx, rx) = watch::channel(None);
        groups.insert(key.to_string(), rx.clone());
        drop(groups);

        debug!(key, "starting computation");
        let guard = GroupGuard {
            key: key.to_string(),
            groups: Arc::clone(&self.groups),
            tx: Some(tx),
        };
        tokio::spawn(async move {
            let outcome = work().await;
            guard.resolve(outcome);
        });

        Waiter { rx, started: true }
    }

    /// Number of groups currently pending.
    pub fn in_flight(&self) -> usize {
        self.groups.lock().len()
    }

    /// True while a computation for `key` is pending.
    pub fn is_pending(&self, key: &str) -> bool {
        self.groups.lock().contains_key(key)
    }
}

// == Group Guard ==
/// Owns a group's registry slot until the group resolves.
///
/// If the computation unwinds instead of resolving, dropping the guard still
/// frees the slot and closes the channel so waiters are released.
struct GroupGuard<T> {
    key: String,
    groups: Registry<T>,
    tx: Option<watch::Sender<Option<T>>>,
}

impl<T> GroupGuard<T> {
    fn resolve(mut self, outcome: T) {
        // Removal and publication happen under the registry lock, so a caller
        // either joins this group and sees the outcome or starts a fresh one.
        let mut groups = self.groups.lock();
        groups.remove(&self.key);
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome));
        }
    }
}

impl<T> Drop for GroupGuard<T> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.groups.lock().remove(&self.key);
            warn!(key = %self.key, "computation abandoned before resolving");
        }
    }
}

// == Waiter ==
/// A caller's handle on a group's outcome.
#[derive(Debug)]
pub struct Waiter<T> {
    rx: watch::Receiver<Option<T>>,
    started: bool,
}

impl<T: Clone> Waiter<T> {
    /// True if this caller created the group.
    pub fn is_leader(&self) -> bool {
        self.started
    }

    /// Waits for the group to resolve.
    ///
    /// Returns `None` if the computation panicked.
    pub async fn wait(mut self) -> Option<T> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_single_call() {
        let flight = Flight::new();

        let waiter = flight.join("key", || async { "value".to_string() });
        assert!(waiter.is_leader());

        assert_eq!(waiter.wait().await, Some("value".to_string()));
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_joins_share_one_execution() {
        let flight = Flight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let waiters: Vec<_> = (0..10)
            .map(|_| {
                let calls = Arc::clone(&calls);
                flight.join("key", move || async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    calls.fetch_add(1, Ordering::SeqCst) + 100
                })
            })
            .collect();

        assert_eq!(waiters.iter().filter(|w| w.is_leader()).count(), 1);
        assert!(flight.is_pending("key"));

        for waiter in waiters {
            assert_eq!(waiter.wait().await, Some(100));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!flight.is_pending("key"));
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let flight = Flight::new();

        let slow = flight.join("slow", || std::future::pending::<u32>());
        let fast = flight.join("fast", || async { 1 });

        assert!(fast.is_leader());
        assert_eq!(fast.wait().await, Some(1));
        assert!(flight.is_pending("slow"));
        drop(slow);
    }

    #[tokio::test]
    async fn test_new_group_after_resolution() {
        let flight = Flight::new();

        assert_eq!(flight.join("key", || async { 1 }).wait().await, Some(1));

        let second = flight.join("key", || async { 2 });
        assert!(second.is_leader());
        assert_eq!(second.wait().await, Some(2));
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_work() {
        let flight = Flight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let waiter = flight.join("key", move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(waiter);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    async fn explode() -> u32 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        panic!("work failed")
    }

    #[tokio::test]
    async fn test_panicking_work_releases_waiters_and_slot() {
        let flight: Flight<u32> = Flight::new();

        let leader = flight.join("key", explode);
        let follower = flight.join("key", std::future::pending::<u32>);

        assert_eq!(leader.wait().await, None);
        assert_eq!(follower.wait().await, None);
        assert_eq!(flight.in_flight(), 0);
    }
}
