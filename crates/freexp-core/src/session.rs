use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw identity-provider session record, as handed back by the active
/// backend.
///
/// `metadata` carries provider-supplied fields (`full_name`, `name`,
/// `avatar_url`, `role`, ...) in whatever shape the provider uses; the
/// session resolver reads them through [`SessionRecord::metadata_str`] and
/// applies its own precedence rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl SessionRecord {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a non-empty string metadata field, or `None`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}
