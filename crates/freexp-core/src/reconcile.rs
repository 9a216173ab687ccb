//! Schema reconciliation for specialist profiles.
//!
//! Three historical stored shapes of a specialist exist in the wild:
//!
//! - **LegacyCombinedName** — flat user objects with a single combined
//!   `name` field (`{"name": "Иван Петров", "telegram": "...", ...}`),
//! - **Remote** — remote-service rows with snake_case fields
//!   (`first_name`, `last_name`, `avatar_url`, `portfolio_items`),
//! - **Canonical** — the camelCase shape of [`SpecialistProfile`] itself.
//!
//! The variant is detected once at the ingestion boundary (storage read or
//! remote response parse) and carried as an explicit [`ProfileVariant`]
//! discriminant rather than re-inspected at every use site. Normalization
//! never fails: unknown or missing fields degrade to empty strings or
//! defaults.

use serde_json::{Map, Value, json};

use crate::profile::{
    MAX_IMAGES_PER_ITEM, MAX_PORTFOLIO_ITEMS, MAX_PREVIEW_IMAGES, PortfolioProject,
    Specialization, SpecialistProfile,
};

/// Discriminant for the historical stored shapes of a specialist profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVariant {
    /// Legacy flat user object with a single combined `name` string.
    LegacyCombinedName,
    /// Remote-service row with snake_case fields.
    Remote,
    /// The canonical camelCase shape.
    Canonical,
}

impl ProfileVariant {
    /// Detects which variant a raw record matches, by field presence.
    ///
    /// A string-valued `name` marks the legacy combined-name shape; a
    /// `first_name` field marks the remote shape; everything else is
    /// treated as canonical.
    pub fn detect(raw: &Value) -> Self {
        if raw.get("name").is_some_and(Value::is_string) {
            Self::LegacyCombinedName
        } else if raw.get("first_name").is_some() {
            Self::Remote
        } else {
            Self::Canonical
        }
    }
}

/// Normalizes a raw stored record of unknown shape into the canonical
/// profile. Detects the variant first; see [`normalize_with`].
pub fn normalize(raw: &Value) -> SpecialistProfile {
    normalize_with(ProfileVariant::detect(raw), raw)
}

/// Normalizes a raw record whose variant was already detected at the
/// ingestion boundary. Never fails; missing fields degrade to defaults.
pub fn normalize_with(variant: ProfileVariant, raw: &Value) -> SpecialistProfile {
    let (first_name, last_name, telegram, avatar_key, contact_key, portfolio_key) = match variant {
        ProfileVariant::LegacyCombinedName => {
            // Explicit split-name fields beat the derived split when both
            // are present.
            let explicit_first = str_field(raw, "firstName");
            let (first, last) = if explicit_first.is_empty() {
                split_name(&str_field(raw, "name"))
            } else {
                (explicit_first, str_field(raw, "lastName"))
            };
            (first, last, str_field(raw, "telegram"), "avatarUrl", "contactEmail", "portfolio")
        }
        ProfileVariant::Remote => (
            str_field(raw, "first_name"),
            str_field(raw, "last_name"),
            str_field(raw, "telegram_handle"),
            "avatar_url",
            "contact_email",
            "portfolio_items",
        ),
        ProfileVariant::Canonical => (
            str_field(raw, "firstName"),
            str_field(raw, "lastName"),
            str_field(raw, "telegramHandle"),
            "avatarUrl",
            "contactEmail",
            "portfolioItems",
        ),
    };

    let visible_key = match variant {
        ProfileVariant::Remote => "visible_in_search",
        _ => "visibleInSearch",
    };

    let mut profile = SpecialistProfile::new(str_field(raw, "id"));
    profile.first_name = first_name;
    profile.last_name = last_name;
    profile.specialization = raw
        .get("specialization")
        .and_then(Value::as_str)
        .map(Specialization::parse_lossy)
        .unwrap_or_default();
    profile.bio = opt_str_field(raw, "bio");
    profile.telegram_handle = telegram;
    profile.contact_email = opt_str_field(raw, contact_key);
    profile.avatar_url = opt_str_field(raw, avatar_key);
    profile.visible_in_search = raw.get(visible_key).and_then(Value::as_bool).unwrap_or(true);
    profile.set_portfolio(parse_portfolio(raw.get(portfolio_key)));
    profile
}

/// Inverse mapping: renders a canonical profile in the shape a given
/// backend variant expects.
pub fn denormalize(profile: &SpecialistProfile, variant: ProfileVariant) -> Value {
    match variant {
        ProfileVariant::Canonical => {
            serde_json::to_value(profile).unwrap_or(Value::Null)
        }
        ProfileVariant::LegacyCombinedName => {
            let mut record = Map::new();
            record.insert("id".into(), profile.id.clone().into());
            record.insert(
                "name".into(),
                profile.full_name().unwrap_or_default().into(),
            );
            record.insert(
                "specialization".into(),
                profile.specialization.as_str().into(),
            );
            if let Some(bio) = &profile.bio {
                record.insert("bio".into(), bio.clone().into());
            }
            record.insert("telegram".into(), profile.telegram_handle.clone().into());
            if let Some(email) = &profile.contact_email {
                record.insert("contactEmail".into(), email.clone().into());
            }
            if let Some(avatar) = &profile.avatar_url {
                record.insert("avatarUrl".into(), avatar.clone().into());
            }
            record.insert("visibleInSearch".into(), profile.visible_in_search.into());
            record.insert(
                "portfolio".into(),
                portfolio_value(&profile.portfolio_items),
            );
            Value::Object(record)
        }
        ProfileVariant::Remote => {
            let mut record = Map::new();
            record.insert("id".into(), profile.id.clone().into());
            record.insert("first_name".into(), profile.first_name.clone().into());
            record.insert("last_name".into(), profile.last_name.clone().into());
            record.insert(
                "specialization".into(),
                profile.specialization.as_str().into(),
            );
            if let Some(bio) = &profile.bio {
                record.insert("bio".into(), bio.clone().into());
            }
            record.insert(
                "telegram_handle".into(),
                profile.telegram_handle.clone().into(),
            );
            if let Some(email) = &profile.contact_email {
                record.insert("contact_email".into(), email.clone().into());
            }
            if let Some(avatar) = &profile.avatar_url {
                record.insert("avatar_url".into(), avatar.clone().into());
            }
            record.insert("visible_in_search".into(), profile.visible_in_search.into());
            record.insert(
                "portfolio_items".into(),
                portfolio_value(&profile.portfolio_items),
            );
            Value::Object(record)
        }
    }
}

/// Flattens portfolio image URLs into a preview list: absolute HTTP(S) or
/// root-relative paths only, embedded binary-encoded images rejected,
/// capped at [`MAX_PREVIEW_IMAGES`], source order preserved.
pub fn derive_portfolio_preview(items: &[PortfolioProject]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.images.iter())
        .filter(|url| is_previewable_url(url))
        .take(MAX_PREVIEW_IMAGES)
        .cloned()
        .collect()
}

/// Whether a stored image reference can be used in a search preview.
/// Accepts absolute `http(s)` URLs and root-relative paths; rejects
/// data URIs and protocol-relative references.
pub fn is_previewable_url(url: &str) -> bool {
    url.starts_with("http://")
        || url.starts_with("https://")
        || (url.starts_with('/') && !url.starts_with("//"))
}

/// Splits a combined name on the first space: first token becomes the
/// first name, the remainder the last name.
pub fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_portfolio(raw: Option<&Value>) -> Vec<PortfolioProject> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .take(MAX_PORTFOLIO_ITEMS)
        .map(|item| {
            let images = item
                .get("images")
                .and_then(Value::as_array)
                .map(|images| {
                    images
                        .iter()
                        .filter_map(Value::as_str)
                        .take(MAX_IMAGES_PER_ITEM)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            PortfolioProject {
                title: str_field(item, "title"),
                description: str_field(item, "description"),
                images,
            }
        })
        .collect()
}

fn portfolio_value(items: &[PortfolioProject]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| {
                json!({
                    "title": item.title,
                    "description": item.description,
                    "images": item.images,
                })
            })
            .collect(),
    )
}
