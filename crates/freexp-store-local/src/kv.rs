//! The synchronous string-keyed store the local backend persists into.
//!
//! This mirrors an origin-scoped browser storage surface: string keys,
//! string values, a capacity ceiling, and writes that can fail with a
//! quota error. Calls are synchronous and treated as instantaneous by the
//! async layer above.

use thiserror::Error;

/// Errors raised by a [`KvStore`] write.
#[derive(Debug, Error)]
pub enum KvError {
    /// The write would exceed the store's capacity ceiling.
    #[error("key-value store quota exceeded: {used} of {limit} bytes")]
    QuotaExceeded { used: usize, limit: usize },
}

/// Synchronous string-keyed durable storage with a capacity ceiling.
///
/// Only ever mutated from the single foreground execution context, so
/// implementations need no locking discipline beyond their own internal
/// consistency.
pub trait KvStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Removes `key`. Idempotent.
    fn remove(&self, key: &str);

    /// All keys starting with `prefix`, in no particular order.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}
