//! [`Backend`] implementation over a [`KvStore`].
//!
//! Every entity is stored as a JSON string under a namespaced key. Records
//! written by older application versions may still be in the legacy flat
//! shape; profile reads therefore go through the schema reconciler, which
//! detects the variant at this ingestion boundary. A record that fails to
//! parse at all is logged and treated as absent, never as fatal.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use freexp_core::{Application, Project, SessionRecord, SpecialistProfile, reconcile};
use freexp_storage::{
    ApplicationFilter, Backend, ProfileFilter, ProjectFilter, StorageError, StorageResult,
};

use crate::kv::{KvError, KvStore};

mod keys {
    pub const SESSION: &str = "freexp:session";
    pub const PROFILE_PREFIX: &str = "freexp:profile:";
    pub const PROJECT_PREFIX: &str = "freexp:project:";
    pub const APPLICATION_PREFIX: &str = "freexp:application:";

    pub fn profile(id: &str) -> String {
        format!("{PROFILE_PREFIX}{id}")
    }

    pub fn project(id: &str) -> String {
        format!("{PROJECT_PREFIX}{id}")
    }

    pub fn application(id: &str) -> String {
        format!("{APPLICATION_PREFIX}{id}")
    }
}

/// Local durable backend, active when no remote service is configured.
pub struct LocalBackend {
    kv: Arc<dyn KvStore>,
}

impl LocalBackend {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Parses a stored JSON string, treating a malformed record as absent.
    fn parse_stored(&self, key: &str, stored: &str) -> Option<Value> {
        match serde_json::from_str(stored) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key = %key, %error, "malformed stored record treated as absent");
                None
            }
        }
    }

    fn read_value(&self, key: &str) -> Option<Value> {
        let stored = self.kv.get(key)?;
        self.parse_stored(key, &stored)
    }

    fn write_value(&self, key: &str, value: &Value) -> StorageResult<()> {
        self.kv
            .set(key, &value.to_string())
            .map_err(|KvError::QuotaExceeded { used, limit }| {
                StorageError::quota_exceeded(used, limit)
            })
    }

    /// Collects and decodes every record under a key prefix, skipping
    /// malformed entries.
    fn collect_prefix<T, F>(&self, prefix: &str, decode: F) -> Vec<T>
    where
        F: Fn(&Value) -> Option<T>,
    {
        self.kv
            .keys_with_prefix(prefix)
            .iter()
            .filter_map(|key| self.read_value(key))
            .filter_map(|value| decode(&value))
            .collect()
    }
}

fn decode_entity<T: serde::de::DeserializeOwned>(value: &Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(entity) => Some(entity),
        Err(error) => {
            warn!(%error, "stored record failed shape validation, skipping");
            None
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn read_session(&self) -> StorageResult<Option<SessionRecord>> {
        Ok(self
            .read_value(keys::SESSION)
            .as_ref()
            .and_then(decode_entity))
    }

    async fn write_session(&self, session: &SessionRecord) -> StorageResult<SessionRecord> {
        let value = serde_json::to_value(session)
            .map_err(|e| StorageError::malformed(e.to_string()))?;
        self.write_value(keys::SESSION, &value)?;
        Ok(session.clone())
    }

    async fn clear_session(&self) -> StorageResult<()> {
        self.kv.remove(keys::SESSION);
        Ok(())
    }

    async fn read_profile(&self, id: &str) -> StorageResult<Option<SpecialistProfile>> {
        // Reconcile instead of strict decode: the record may be a legacy
        // flat user object.
        Ok(self
            .read_value(&keys::profile(id))
            .map(|raw| reconcile::normalize(&raw)))
    }

    async fn write_profile(
        &self,
        profile: &SpecialistProfile,
    ) -> StorageResult<SpecialistProfile> {
        let value = reconcile::denormalize(profile, reconcile::ProfileVariant::Canonical);
        self.write_value(&keys::profile(&profile.id), &value)?;
        Ok(profile.clone())
    }

    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
    ) -> StorageResult<Vec<SpecialistProfile>> {
        let profiles = self.collect_prefix(keys::PROFILE_PREFIX, |raw| {
            Some(reconcile::normalize(raw))
        });
        Ok(profiles.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn read_project(&self, id: &str) -> StorageResult<Option<Project>> {
        Ok(self
            .read_value(&keys::project(id))
            .as_ref()
            .and_then(decode_entity))
    }

    async fn write_project(&self, project: &Project) -> StorageResult<Project> {
        let value = serde_json::to_value(project)
            .map_err(|e| StorageError::malformed(e.to_string()))?;
        self.write_value(&keys::project(&project.id), &value)?;
        Ok(project.clone())
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> StorageResult<Vec<Project>> {
        let projects = self.collect_prefix(keys::PROJECT_PREFIX, decode_entity);
        Ok(projects.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn read_application(&self, id: &str) -> StorageResult<Option<Application>> {
        Ok(self
            .read_value(&keys::application(id))
            .as_ref()
            .and_then(decode_entity))
    }

    async fn write_application(&self, application: &Application) -> StorageResult<Application> {
        let value = serde_json::to_value(application)
            .map_err(|e| StorageError::malformed(e.to_string()))?;
        self.write_value(&keys::application(&application.id), &value)?;
        Ok(application.clone())
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StorageResult<Vec<Application>> {
        let applications = self.collect_prefix(keys::APPLICATION_PREFIX, decode_entity);
        Ok(applications
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect())
    }

    async fn application_exists(
        &self,
        project_id: &str,
        applicant_id: &str,
    ) -> StorageResult<bool> {
        let filter = ApplicationFilter {
            project_id: Some(project_id.to_string()),
            applicant_id: Some(applicant_id.to_string()),
        };
        Ok(!self.list_applications(&filter).await?.is_empty())
    }

    /// There is no asset host in local mode; the image is embedded as a
    /// data URI. The portfolio preview deliberately filters these out.
    async fn upload_asset(&self, bytes: &[u8], content_type: &str) -> StorageResult<String> {
        Ok(format!(
            "data:{content_type};base64,{}",
            BASE64.encode(bytes)
        ))
    }
}
