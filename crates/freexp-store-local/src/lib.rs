//! Local durable storage backend for FreeExperience.
//!
//! This crate provides the client-side fallback persistence used when no
//! remote service is configured: a synchronous string-keyed [`KvStore`]
//! with a capacity ceiling, an in-memory implementation
//! ([`MemoryKvStore`]), and [`LocalBackend`], which implements the
//! `freexp-storage` [`Backend`](freexp_storage::Backend) trait on top of
//! the key-value surface.

pub mod backend;
pub mod kv;
pub mod memory;

pub use backend::LocalBackend;
pub use kv::{KvError, KvStore};
pub use memory::{DEFAULT_QUOTA_BYTES, MemoryKvStore};

use std::sync::Arc;

/// Creates a local backend over a fresh in-memory store.
pub fn create_local_backend() -> freexp_storage::DynBackend {
    Arc::new(LocalBackend::new(Arc::new(MemoryKvStore::new())))
}
