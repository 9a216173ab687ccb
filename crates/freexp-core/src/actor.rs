use serde::{Deserialize, Serialize};

/// Which side of the marketplace an actor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    #[default]
    Specialist,
    Company,
}

impl ActorRole {
    /// Parses a stored role value, degrading unknown values to the default.
    pub fn parse_lossy(value: &str) -> Self {
        match value {
            "company" => Self::Company,
            _ => Self::Specialist,
        }
    }
}

/// Canonical view of "who is currently using the system".
///
/// Recomputed on every session-state change and on demand; never persisted
/// by the data-access layer itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub email: String,
    /// Derived display name. Never equal to the raw login email; see the
    /// candidate precedence in the session resolver.
    pub display_name: String,
    pub role: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
