//! The store facade consumed by UI collaborators.
//!
//! [`MarketStore`] wraps the process's single active [`Backend`] and routes
//! id-keyed reads through the [`AsyncCache`]. Writes invalidate the
//! matching key prefix. It also owns the application-uniqueness domain
//! rule: a lookup-before-insert check that surfaces a duplicate as
//! [`StorageError::DuplicateApplication`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use freexp_core::{Application, Project, SessionRecord, SpecialistProfile};

use crate::cache::{AsyncCache, DEFAULT_TTL};
use crate::error::{StorageError, StorageResult};
use crate::traits::DynBackend;
use crate::types::{ApplicationFilter, ProfileFilter, ProjectFilter};

/// Cache key construction. Keys encode entity type + id; the prefixes
/// double as invalidation scopes.
pub mod keys {
    /// The single current-session entry.
    pub const SESSION: &str = "auth:session";
    /// Invalidation scope for everything derived from identity state.
    pub const AUTH_PREFIX: &str = "auth:";
    pub const PROFILE_PREFIX: &str = "profile:";
    pub const PROJECT_PREFIX: &str = "project:";

    pub fn profile(id: &str) -> String {
        format!("{PROFILE_PREFIX}{id}")
    }

    pub fn project(id: &str) -> String {
        format!("{PROJECT_PREFIX}{id}")
    }
}

/// Facade over the active backend, with cached reads.
///
/// Cloning is cheap; clones share the backend and the cache.
#[derive(Clone)]
pub struct MarketStore {
    backend: DynBackend,
    cache: AsyncCache,
    ttl: Duration,
}

impl MarketStore {
    pub fn new(backend: DynBackend) -> Self {
        Self::with_ttl(backend, DEFAULT_TTL)
    }

    pub fn with_ttl(backend: DynBackend, ttl: Duration) -> Self {
        Self {
            backend,
            cache: AsyncCache::new(),
            ttl,
        }
    }

    /// The active backend, for operations that bypass the cache.
    pub fn backend(&self) -> &DynBackend {
        &self.backend
    }

    pub fn cache(&self) -> &AsyncCache {
        &self.cache
    }

    // ==================== Session ====================

    /// The current identity session, cached under [`keys::SESSION`].
    pub async fn session(&self, force_refresh: bool) -> StorageResult<Option<SessionRecord>> {
        let backend = Arc::clone(&self.backend);
        let value = self
            .cache
            .get(keys::SESSION, self.ttl, force_refresh, move || async move {
                encode(&backend.read_session().await?)
            })
            .await?;
        Ok(decode_cached(value))
    }

    /// Stores the session (sign-in) and invalidates identity-derived state.
    pub async fn write_session(&self, session: &SessionRecord) -> StorageResult<SessionRecord> {
        let persisted = self.backend.write_session(session).await?;
        self.cache.invalidate(Some(keys::AUTH_PREFIX));
        Ok(persisted)
    }

    /// Clears the session (sign-out) and invalidates identity-derived state.
    pub async fn clear_session(&self) -> StorageResult<()> {
        self.backend.clear_session().await?;
        self.cache.invalidate(Some(keys::AUTH_PREFIX));
        Ok(())
    }

    // ==================== Specialist profiles ====================

    pub async fn profile(
        &self,
        id: &str,
        force_refresh: bool,
    ) -> StorageResult<Option<SpecialistProfile>> {
        let backend = Arc::clone(&self.backend);
        let owned_id = id.to_string();
        let value = self
            .cache
            .get(
                &keys::profile(id),
                self.ttl,
                force_refresh,
                move || async move { encode(&backend.read_profile(&owned_id).await?) },
            )
            .await?;
        Ok(decode_cached(value))
    }

    pub async fn write_profile(
        &self,
        profile: &SpecialistProfile,
    ) -> StorageResult<SpecialistProfile> {
        let persisted = self.backend.write_profile(profile).await?;
        self.cache.invalidate(Some(keys::PROFILE_PREFIX));
        Ok(persisted)
    }

    /// Uncached; search pages re-query on navigation.
    pub async fn list_profiles(
        &self,
        filter: &ProfileFilter,
    ) -> StorageResult<Vec<SpecialistProfile>> {
        self.backend.list_profiles(filter).await
    }

    // ==================== Projects ====================

    pub async fn project(&self, id: &str, force_refresh: bool) -> StorageResult<Option<Project>> {
        let backend = Arc::clone(&self.backend);
        let owned_id = id.to_string();
        let value = self
            .cache
            .get(
                &keys::project(id),
                self.ttl,
                force_refresh,
                move || async move { encode(&backend.read_project(&owned_id).await?) },
            )
            .await?;
        Ok(decode_cached(value))
    }

    /// Reads a project with its `application_count` recomputed from the
    /// live application collection.
    pub async fn project_with_count(
        &self,
        id: &str,
        force_refresh: bool,
    ) -> StorageResult<Option<Project>> {
        let Some(mut project) = self.project(id, force_refresh).await? else {
            return Ok(None);
        };
        let applications = self
            .backend
            .list_applications(&ApplicationFilter::by_project(id))
            .await?;
        project.application_count = applications.len() as u32;
        Ok(Some(project))
    }

    pub async fn write_project(&self, project: &Project) -> StorageResult<Project> {
        let persisted = self.backend.write_project(project).await?;
        self.cache.invalidate(Some(keys::PROJECT_PREFIX));
        Ok(persisted)
    }

    pub async fn list_projects(&self, filter: &ProjectFilter) -> StorageResult<Vec<Project>> {
        self.backend.list_projects(filter).await
    }

    // ==================== Applications ====================

    /// Submits an application, enforcing at most one per
    /// (project, applicant) pair.
    ///
    /// The check-then-write is not transactional: two submissions racing
    /// from separate tabs or devices can both pass the existence check.
    /// This is an accepted limitation for a low-contention, single-user
    /// UI action; a backend-level uniqueness constraint is the remedy for
    /// stronger guarantees.
    pub async fn submit_application(
        &self,
        application: &Application,
    ) -> StorageResult<Application> {
        let exists = self
            .backend
            .application_exists(&application.project_id, &application.applicant_id)
            .await?;
        if exists {
            return Err(StorageError::duplicate_application(
                &application.project_id,
                &application.applicant_id,
            ));
        }
        let persisted = self.backend.write_application(application).await?;
        // Application counts are derived from this collection.
        self.cache.invalidate(Some(keys::PROJECT_PREFIX));
        Ok(persisted)
    }

    pub async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StorageResult<Vec<Application>> {
        self.backend.list_applications(filter).await
    }

    // ==================== Assets ====================

    pub async fn upload_asset(&self, bytes: &[u8], content_type: &str) -> StorageResult<String> {
        self.backend.upload_asset(bytes, content_type).await
    }
}

/// Serializes a backend read result for the cache. `None` is cached as
/// JSON null, so absence is memoized like any other result.
fn encode<T: serde::Serialize>(value: &T) -> StorageResult<Value> {
    serde_json::to_value(value).map_err(|e| StorageError::malformed(e.to_string()))
}

/// Decodes a cached value back into an entity. A malformed cached record
/// is logged and treated as absent, never surfaced as an error.
fn decode_cached<T: DeserializeOwned>(value: Value) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(entity) => Some(entity),
        Err(error) => {
            warn!(%error, "malformed cached record treated as absent");
            None
        }
    }
}
