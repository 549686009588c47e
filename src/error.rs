//! Error types for the read-through cache
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type returned by [`Cache::get`](crate::Cache::get).
///
/// Errors are `Clone` because a single group outcome is handed to every caller
/// that joined the group.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The backend holds a value of a different type than the cache expects
    #[error("value cached under {key:?} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// The producer returned an error
    #[error(transparent)]
    Producer(#[from] ProducerError),

    /// The backend refused to store a freshly produced value
    #[error("failed to store {key:?}: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The producer panicked before resolving its group
    #[error("producer for {key:?} panicked")]
    ProducerPanicked { key: String },

    /// The caller's context was cancelled while waiting
    #[error("call cancelled")]
    Cancelled,

    /// The caller's deadline passed while waiting
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl CacheError {
    /// Returns the producer's original error, if this is a producer failure.
    pub fn producer_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Producer(err) => Some(err.inner()),
            _ => None,
        }
    }

    /// True when the error describes the caller's own wait ending, not the computation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CacheError::Cancelled | CacheError::DeadlineExceeded)
    }
}

// == Producer Error ==
/// A producer failure shared between every waiter of a group.
///
/// Display, Debug and `source` all forward to the wrapped error unchanged.
#[derive(Clone)]
pub struct ProducerError(Arc<anyhow::Error>);

impl ProducerError {
    /// Returns the error the producer returned.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for ProducerError {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

impl fmt::Display for ProducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{:#}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Debug for ProducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::error::Error for ProducerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

// == Storage Error ==
/// Error returned by a [`Storage`](crate::Storage) backend on `set`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend refused the write for its own reasons
    #[error("write rejected: {0}")]
    Rejected(String),
}

// == Config Error ==
/// Invalid construction parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A bounded store needs room for at least one entry
    #[error("capacity must be greater than zero")]
    ZeroCapacity,
}

// == Result Type Alias ==
/// Convenience Result type for cache lookups.
pub type Result<T> = std::result::Result<T, CacheError>;
