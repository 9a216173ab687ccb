use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::warn;
use url::Url;

use freexp_config::RemoteConfig;
use freexp_core::{Application, Project, SessionRecord, SpecialistProfile, reconcile};
use freexp_storage::{
    ApplicationFilter, Backend, ProfileFilter, ProjectFilter, StorageError, StorageResult,
};

/// HTTP request timeout for the persistence service.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Backend over the remote persistence service, active when the service is
/// configured.
pub struct RemoteBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl RemoteBackend {
    /// Builds a client for the configured endpoint.
    ///
    /// Returns [`StorageError::NotConfigured`] when the configuration
    /// cannot produce a usable client (e.g. a key that is not a valid
    /// header value); callers fall back to the local backend.
    pub fn new(config: RemoteConfig) -> StorageResult<Self> {
        let mut base_url = config.url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let key = HeaderValue::from_str(&config.anon_key)
            .map_err(|_| StorageError::NotConfigured)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key))
            .map_err(|_| StorageError::NotConfigured)?;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|_| StorageError::NotConfigured)?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> StorageResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StorageError::transport(format!("invalid endpoint {path}: {e}")))
    }

    /// Reads one record: `Ok(None)` on 404, transport error otherwise.
    /// An unreadable body is logged and treated as absent.
    async fn read_record(&self, path: &str) -> StorageResult<Option<Value>> {
        let url = self.endpoint(path)?;
        let response = self.http.get(url).send().await.map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response)?;
        match response.json::<Value>().await {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                warn!(path = %path, %error, "malformed remote record treated as absent");
                Ok(None)
            }
        }
    }

    /// Writes one record and returns the persisted form the service sends
    /// back.
    async fn write_record(&self, path: &str, body: &Value) -> StorageResult<Value> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .put(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response)?;
        response
            .json::<Value>()
            .await
            .map_err(|e| StorageError::transport(format!("unreadable write response: {e}")))
    }

    /// Lists a collection with query-string filters, skipping rows that
    /// fail to decode.
    async fn list_records(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> StorageResult<Vec<Value>> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response)?;
        match response.json::<Vec<Value>>().await {
            Ok(rows) => Ok(rows),
            Err(error) => {
                warn!(path = %path, %error, "malformed remote listing treated as empty");
                Ok(Vec::new())
            }
        }
    }
}

fn transport(error: reqwest::Error) -> StorageError {
    StorageError::transport(error.to_string())
}

fn check_status(response: Response) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StorageError::transport(format!(
            "remote service responded with {status}"
        )))
    }
}

fn decode_row<T: serde::de::DeserializeOwned>(row: &Value) -> Option<T> {
    match serde_json::from_value(row.clone()) {
        Ok(entity) => Some(entity),
        Err(error) => {
            warn!(%error, "remote row failed shape validation, skipping");
            None
        }
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn read_session(&self) -> StorageResult<Option<SessionRecord>> {
        Ok(self
            .read_record("session")
            .await?
            .as_ref()
            .and_then(decode_row))
    }

    async fn write_session(&self, session: &SessionRecord) -> StorageResult<SessionRecord> {
        let body = serde_json::to_value(session)
            .map_err(|e| StorageError::malformed(e.to_string()))?;
        let persisted = self.write_record("session", &body).await?;
        Ok(decode_row(&persisted).unwrap_or_else(|| session.clone()))
    }

    async fn clear_session(&self) -> StorageResult<()> {
        let url = self.endpoint("session")?;
        let response = self.http.delete(url).send().await.map_err(transport)?;
        // Idempotent: clearing an absent session is fine.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response)?;
        Ok(())
    }

    async fn read_profile(&self, id: &str) -> StorageResult<Option<SpecialistProfile>> {
        // Rows arrive in the snake_case remote shape; reconcile here at
        // the ingestion boundary.
        Ok(self
            .read_record(&format!("profiles/{id}"))
            .await?
            .map(|raw| reconcile::normalize(&raw)))
    }

    async fn write_profile(
        &self,
        profile: &SpecialistProfile,
    ) -> StorageResult<SpecialistProfile> {
        let body = reconcile::denormalize(profile, reconcile::ProfileVariant::Remote);
        let persisted = self
            .write_record(&format!("profiles/{}", profile.id), &body)
            .await?;
        Ok(reconcile::normalize(&persisted))
    }

    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
    ) -> StorageResult<Vec<SpecialistProfile>> {
        let mut query = Vec::new();
        if let Some(visible) = filter.visible_in_search {
            query.push(("visible_in_search", visible.to_string()));
        }
        if let Some(specialization) = filter.specialization {
            query.push(("specialization", specialization.to_string()));
        }
        let rows = self.list_records("profiles", &query).await?;
        Ok(rows.iter().map(reconcile::normalize).collect())
    }

    async fn read_project(&self, id: &str) -> StorageResult<Option<Project>> {
        Ok(self
            .read_record(&format!("projects/{id}"))
            .await?
            .as_ref()
            .and_then(decode_row))
    }

    async fn write_project(&self, project: &Project) -> StorageResult<Project> {
        let body = serde_json::to_value(project)
            .map_err(|e| StorageError::malformed(e.to_string()))?;
        let persisted = self
            .write_record(&format!("projects/{}", project.id), &body)
            .await?;
        Ok(decode_row(&persisted).unwrap_or_else(|| project.clone()))
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> StorageResult<Vec<Project>> {
        let mut query = Vec::new();
        if let Some(owner_id) = &filter.owner_id {
            query.push(("owner_id", owner_id.clone()));
        }
        if let Some(specialization) = filter.specialization {
            query.push(("specialization", specialization.to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("status", status.as_str().to_string()));
        }
        let rows = self.list_records("projects", &query).await?;
        Ok(rows.iter().filter_map(decode_row).collect())
    }

    async fn read_application(&self, id: &str) -> StorageResult<Option<Application>> {
        Ok(self
            .read_record(&format!("applications/{id}"))
            .await?
            .as_ref()
            .and_then(decode_row))
    }

    async fn write_application(&self, application: &Application) -> StorageResult<Application> {
        let body = serde_json::to_value(application)
            .map_err(|e| StorageError::malformed(e.to_string()))?;
        let url = self.endpoint(&format!("applications/{}", application.id))?;
        let response = self
            .http
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        // A service-side uniqueness constraint reports the same domain
        // conflict the client-side check does.
        if response.status() == StatusCode::CONFLICT {
            return Err(StorageError::duplicate_application(
                &application.project_id,
                &application.applicant_id,
            ));
        }
        let response = check_status(response)?;
        let persisted = response
            .json::<Value>()
            .await
            .map_err(|e| StorageError::transport(format!("unreadable write response: {e}")))?;
        Ok(decode_row(&persisted).unwrap_or_else(|| application.clone()))
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> StorageResult<Vec<Application>> {
        let mut query = Vec::new();
        if let Some(project_id) = &filter.project_id {
            query.push(("project_id", project_id.clone()));
        }
        if let Some(applicant_id) = &filter.applicant_id {
            query.push(("applicant_id", applicant_id.clone()));
        }
        let rows = self.list_records("applications", &query).await?;
        Ok(rows.iter().filter_map(decode_row).collect())
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

    async fn upload_asset(&self, bytes: &[u8], content_type: &str) -> StorageResult<String> {
        let url = self.endpoint("assets")?;
        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response)?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| StorageError::transport(format!("unreadable upload response: {e}")))?;
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StorageError::transport("upload response missing public url"))
    }
}
