//! Canonical domain model for the FreeExperience marketplace.
//!
//! This crate defines the single in-memory representation of every entity
//! that crosses the data-access layer: the current [`Actor`], a
//! [`SpecialistProfile`] with its portfolio, a [`Project`] posting, and an
//! [`Application`]. It also owns the [`reconcile`] module, which converts
//! the historical stored shapes of a specialist profile into the canonical
//! one and back.
//!
//! Storage backends and UI collaborators only ever exchange the types in
//! this crate; raw backend-shaped records stop at the ingestion boundary.

pub mod actor;
pub mod application;
pub mod error;
pub mod id;
pub mod profile;
pub mod project;
pub mod reconcile;
pub mod session;

pub use actor::{Actor, ActorRole};
pub use application::Application;
pub use error::{CoreError, Result};
pub use id::generate_id;
pub use profile::{
    MAX_IMAGES_PER_ITEM, MAX_PORTFOLIO_ITEMS, MAX_PREVIEW_IMAGES, PortfolioProject,
    Specialization, SpecialistProfile,
};
pub use project::{Project, ProjectStatus};
pub use reconcile::ProfileVariant;
pub use session::SessionRecord;
