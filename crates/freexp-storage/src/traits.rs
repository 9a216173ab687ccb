//! The backend trait for the dual-persistence abstraction.
//!
//! Exactly one backend is selected per process, by a single static
//! availability check at startup ("is the remote service configured").
//! Because no runtime migration between backends ever happens, the trait
//! exists purely so every collaborator calls one interface regardless of
//! which backend is live.

use async_trait::async_trait;
use std::sync::Arc;

use freexp_core::{Application, Project, SessionRecord, SpecialistProfile};

use crate::error::StorageResult;
use crate::types::{ApplicationFilter, ProfileFilter, ProjectFilter};

/// Uniform async persistence surface over the four entity collections.
///
/// Conventions, shared by all implementations:
///
/// - reads return `Ok(None)` for "not found" and only error on transport
///   or storage failure;
/// - writes create-or-replace and return the persisted form, which may
///   differ from the input (server-assigned fields);
/// - list operations guarantee no ordering — callers sort;
/// - a malformed stored record is recovered as absent, never fatal.
#[async_trait]
pub trait Backend: Send + Sync {
    // ==================== Session ====================

    /// Reads the current identity session, if any.
    async fn read_session(&self) -> StorageResult<Option<SessionRecord>>;

    /// Stores the current identity session (sign-in).
    async fn write_session(&self, session: &SessionRecord) -> StorageResult<SessionRecord>;

    /// Clears the current identity session (sign-out). Idempotent.
    async fn clear_session(&self) -> StorageResult<()>;

    // ==================== Specialist profiles ====================

    async fn read_profile(&self, id: &str) -> StorageResult<Option<SpecialistProfile>>;

    async fn write_profile(&self, profile: &SpecialistProfile)
    -> StorageResult<SpecialistProfile>;

    async fn list_profiles(&self, filter: &ProfileFilter)
    -> StorageResult<Vec<SpecialistProfile>>;

    // ==================== Projects ====================

    async fn read_project(&self, id: &str) -> StorageResult<Option<Project>>;

    async fn write_project(&self, project: &Project) -> StorageResult<Project>;

    async fn list_projects(&self, filter: &ProjectFilter) -> StorageResult<Vec<Project>>;

    // ==================== Applications ====================

    async fn read_application(&self, id: &str) -> StorageResult<Option<Application>>;

    async fn write_application(&self, application: &Application) -> StorageResult<Application>;

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StorageResult<Vec<Application>>;

    /// Whether an application by `applicant_id` to `project_id` already
    /// exists. Used for the lookup-before-insert uniqueness check; it runs
    /// against the same backend that receives the subsequent write, so the
    /// check and the write can never disagree about which store they hit.
    async fn application_exists(
        &self,
        project_id: &str,
        applicant_id: &str,
    ) -> StorageResult<bool>;

    // ==================== Assets ====================

    /// Uploads a binary asset and returns a stable public URL for it.
    async fn upload_asset(&self, bytes: &[u8], content_type: &str) -> StorageResult<String>;
}

/// Type alias for a shareable backend instance.
pub type DynBackend = Arc<dyn Backend>;
