use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CoreError, Result};

/// One specialist's application to one project.
///
/// At most one application may exist per `(project_id, applicant_id)` pair;
/// the store layer enforces this with a lookup before insert and surfaces a
/// duplicate as a domain error. Applications are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub project_id: String,
    pub applicant_id: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Application {
    /// Creates a new application. The message must be non-empty.
    pub fn new(
        project_id: impl Into<String>,
        applicant_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(CoreError::EmptyMessage);
        }
        Ok(Self {
            id: crate::id::generate_id(),
            project_id: project_id.into(),
            applicant_id: applicant_id.into(),
            message,
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_message() {
        assert!(matches!(
            Application::new("proj-1", "spec-1", "   "),
            Err(CoreError::EmptyMessage)
        ));
    }

    #[test]
    fn created_at_serializes_as_rfc3339() {
        let application = Application::new("proj-1", "spec-1", "Готов взяться").unwrap();
        let value = serde_json::to_value(&application).unwrap();
        assert!(value["createdAt"].as_str().unwrap().contains('T'));
    }
}
