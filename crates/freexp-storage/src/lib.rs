//! Backend abstraction layer for the FreeExperience data-access core.
//!
//! This crate defines the contract every persistence backend implements
//! ([`Backend`]), the error taxonomy that crosses the data-access boundary
//! ([`StorageError`]), the keyed async read cache ([`AsyncCache`]) and the
//! [`MarketStore`] facade that UI collaborators call.
//!
//! Backend implementations live in sibling crates: `freexp-store-local`
//! (durable key-value store on the client) and `freexp-store-remote` (HTTP
//! persistence service).

pub mod cache;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

pub use cache::{AsyncCache, CacheStats, DEFAULT_TTL};
pub use error::{StorageError, StorageResult};
pub use store::{MarketStore, keys};
pub use traits::{Backend, DynBackend};
pub use types::{ApplicationFilter, ProfileFilter, ProjectFilter};
