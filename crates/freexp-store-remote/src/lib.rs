//! Remote persistence backend for FreeExperience.
//!
//! [`RemoteBackend`] implements the `freexp-storage`
//! [`Backend`](freexp_storage::Backend) trait against an HTTP JSON
//! persistence service. The service exposes keyed read/write/list
//! operations over the four entity collections plus a binary asset upload
//! that returns a stable public URL.
//!
//! Profiles travel over the wire in the snake_case remote row shape and
//! pass through the schema reconciler at this ingestion boundary; the
//! canonical shape never leaks to the service, and raw rows never leak to
//! callers.

mod backend;

pub use backend::RemoteBackend;
