//! Call Context Module
//!
//! Per-call cancellation and deadline handling for cache lookups.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;

// == Context ==
/// Governs how long a single caller is willing to wait.
///
/// A context only bounds the caller's own wait. The shared computation a caller
/// joined keeps running for the other callers no matter what happens here.
///
/// # Example
/// ```ignore
/// let token = CancellationToken::new();
/// let ctx = Context::background()
///     .with_cancellation(token.clone())
///     .with_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Stops waiting once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Stops waiting `timeout` from now, or earlier if a deadline is already set.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Stops waiting at `deadline`, or earlier if a deadline is already set.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context is done, if it already is.
    pub fn err(&self) -> Option<CacheError> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(CacheError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CacheError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> CacheError {
        match (&self.token, self.deadline) {
            (Some(token), Some(deadline)) => {
                tokio::select! {
                    _ = token.cancelled() => CacheError::Cancelled,
                    _ = sleep_until(deadline) => CacheError::DeadlineExceeded,
                }
            }
            (Some(token), None) => {
                token.cancelled().await;
                CacheError::Cancelled
            }
            (None, Some(deadline)) => {
                sleep_until(deadline).await;
                CacheError::DeadlineExceeded
            }
            (None, None) => std::future::pending().await,
        }
    }

    /// Drives `fut` until it completes or the context is done, whichever is first.
    ///
    /// `fut` is dropped when the context wins.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, CacheError> {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            output = fut => Ok(output),
            err = self.done() => Err(err),
        }
    }
}
