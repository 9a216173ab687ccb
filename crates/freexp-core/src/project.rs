use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::{CoreError, Result};
use crate::profile::Specialization;

/// Lifecycle status of a project posting. Status transitions are driven by
/// collaborators outside the data-access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Open,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// A task/work posting created by a company (or any actor in simplified
/// mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specialization: Specialization,
    #[serde(with = "date_format")]
    pub deadline: Date,
    #[serde(default)]
    pub status: ProjectStatus,
    /// Derived from the Application collection; a stored value is only a
    /// fallback for when a live count is unobtainable.
    #[serde(default)]
    pub application_count: u32,
}

impl Project {
    /// Creates a new open project, validating that the deadline is not in
    /// the past relative to the creation date.
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        specialization: Specialization,
        deadline: Date,
    ) -> Result<Self> {
        let created = OffsetDateTime::now_utc().date();
        if deadline < created {
            return Err(CoreError::invalid_deadline(
                deadline.to_string(),
                created.to_string(),
            ));
        }
        Ok(Self {
            id: crate::id::generate_id(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: description.into(),
            specialization,
            deadline,
            status: ProjectStatus::Open,
            application_count: 0,
        })
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }
}

mod date_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;
    use time::macros::format_description;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let format = format_description!("[year]-[month]-[day]");
        let formatted = date.format(&format).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let format = format_description!("[year]-[month]-[day]");
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, &format).map_err(serde::de::Error::custom)
    }
}
