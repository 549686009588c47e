//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired backend entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
