//! Storage error taxonomy.
//!
//! Every error that crosses the data-access boundary is one of these named
//! kinds; no opaque backend error ever reaches a UI collaborator. "Not
//! found" is not an error anywhere in this layer — reads return
//! `Ok(None)`.
//!
//! The enum derives `Clone` so a coalesced in-flight fetch can deliver the
//! identical error to every waiter.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The remote backend was expected but is unavailable or unconfigured.
    /// Collaborators fall back to the local backend rather than failing the
    /// user action.
    #[error("remote backend is not configured")]
    NotConfigured,

    /// Network or remote-service failure during a read or write. Propagated
    /// to the caller; retry policy is a UI concern.
    #[error("transport failure: {message}")]
    TransportFailure {
        /// Description of the transport error.
        message: String,
    },

    /// A local write exceeded the durable store's capacity ceiling.
    #[error("local storage quota exceeded: {used} of {limit} bytes in use")]
    StorageQuotaExceeded {
        /// Bytes the write would have brought the store to.
        used: usize,
        /// The store's capacity ceiling in bytes.
        limit: usize,
    },

    /// A stored record failed shape validation. Recovered internally as
    /// "absent" wherever a record is read; never propagated on read paths.
    #[error("malformed stored record: {message}")]
    MalformedStoredData {
        /// Description of the shape violation.
        message: String,
    },

    /// Domain-level conflict from the application uniqueness rule: at most
    /// one application per (project, applicant) pair.
    #[error("applicant {applicant_id} has already applied to project {project_id}")]
    DuplicateApplication {
        project_id: String,
        applicant_id: String,
    },
}

impl StorageError {
    /// Creates a new `TransportFailure` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    /// Creates a new `StorageQuotaExceeded` error.
    #[must_use]
    pub fn quota_exceeded(used: usize, limit: usize) -> Self {
        Self::StorageQuotaExceeded { used, limit }
    }

    /// Creates a new `MalformedStoredData` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedStoredData {
            message: message.into(),
        }
    }

    /// Creates a new `DuplicateApplication` error.
    #[must_use]
    pub fn duplicate_application(
        project_id: impl Into<String>,
        applicant_id: impl Into<String>,
    ) -> Self {
        Self::DuplicateApplication {
            project_id: project_id.into(),
            applicant_id: applicant_id.into(),
        }
    }

    /// Whether this error is user-actionable rather than a system fault.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateApplication { .. } | Self::StorageQuotaExceeded { .. }
        )
    }
}

/// Convenience alias used throughout the storage layer.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
