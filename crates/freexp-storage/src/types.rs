//! Filter types for list operations.
//!
//! Filters are plain conjunctions of optional predicates. Backends are free
//! to translate them into queries (remote) or evaluate them in-process
//! (local) via the `matches` helpers; either way the list result carries no
//! ordering guarantee — callers sort.

use freexp_core::{Application, Project, ProjectStatus, Specialization, SpecialistProfile};

/// Filter for specialist profile listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFilter {
    /// Only profiles with the given search visibility.
    pub visible_in_search: Option<bool>,
    pub specialization: Option<Specialization>,
}

impl ProfileFilter {
    /// Filter for the public search page: visible profiles only.
    #[must_use]
    pub fn searchable() -> Self {
        Self {
            visible_in_search: Some(true),
            specialization: None,
        }
    }

    #[must_use]
    pub fn with_specialization(mut self, specialization: Specialization) -> Self {
        self.specialization = Some(specialization);
        self
    }

    pub fn matches(&self, profile: &SpecialistProfile) -> bool {
        self.visible_in_search
            .is_none_or(|visible| profile.visible_in_search == visible)
            && self
                .specialization
                .is_none_or(|s| profile.specialization == s)
    }
}

/// Filter for project listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    pub owner_id: Option<String>,
    pub specialization: Option<Specialization>,
    pub status: Option<ProjectStatus>,
}

impl ProjectFilter {
    #[must_use]
    pub fn by_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, project: &Project) -> bool {
        self.owner_id
            .as_deref()
            .is_none_or(|owner| project.owner_id == owner)
            && self
                .specialization
                .is_none_or(|s| project.specialization == s)
            && self.status.is_none_or(|status| project.status == status)
    }
}

/// Filter for application listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationFilter {
    pub project_id: Option<String>,
    pub applicant_id: Option<String>,
}

impl ApplicationFilter {
    #[must_use]
    pub fn by_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            applicant_id: None,
        }
    }

    #[must_use]
    pub fn by_applicant(applicant_id: impl Into<String>) -> Self {
        Self {
            project_id: None,
            applicant_id: Some(applicant_id.into()),
        }
    }

    pub fn matches(&self, application: &Application) -> bool {
        self.project_id
            .as_deref()
            .is_none_or(|id| application.project_id == id)
            && self
                .applicant_id
                .as_deref()
                .is_none_or(|id| application.applicant_id == id)
    }
}
