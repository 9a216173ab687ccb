use thiserror::Error;

/// Errors raised by domain model constructors and validation.
///
/// These never cross the storage boundary; storage operations use the
/// taxonomy in `freexp-storage`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown specialization: {0}")]
    InvalidSpecialization(String),

    #[error("project deadline {deadline} is before creation date {created}")]
    InvalidDeadline { deadline: String, created: String },

    #[error("application message must not be empty")]
    EmptyMessage,

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidSpecialization error
    pub fn invalid_specialization(value: impl Into<String>) -> Self {
        Self::InvalidSpecialization(value.into())
    }

    /// Create a new InvalidDeadline error
    pub fn invalid_deadline(deadline: impl Into<String>, created: impl Into<String>) -> Self {
        Self::InvalidDeadline {
            deadline: deadline.into(),
            created: created.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
