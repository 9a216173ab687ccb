use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Maximum number of portfolio projects a specialist may publish.
pub const MAX_PORTFOLIO_ITEMS: usize = 3;
/// Maximum number of images per portfolio project.
pub const MAX_IMAGES_PER_ITEM: usize = 3;
/// Maximum number of image URLs in the derived portfolio preview.
pub const MAX_PREVIEW_IMAGES: usize = 5;

/// Closed set of specialist specializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Specialization {
    Design,
    Development,
    Marketing,
    Copywriting,
    Smm,
    Photography,
    #[default]
    Other,
}

impl Specialization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Development => "development",
            Self::Marketing => "marketing",
            Self::Copywriting => "copywriting",
            Self::Smm => "smm",
            Self::Photography => "photography",
            Self::Other => "other",
        }
    }

    /// Parses a stored specialization value, degrading unknown or missing
    /// values to the default instead of failing. Used at the reconciliation
    /// boundary, where normalization must never error.
    pub fn parse_lossy(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialization {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "design" => Ok(Self::Design),
            "development" => Ok(Self::Development),
            "marketing" => Ok(Self::Marketing),
            "copywriting" => Ok(Self::Copywriting),
            "smm" => Ok(Self::Smm),
            "photography" => Ok(Self::Photography),
            "other" => Ok(Self::Other),
            _ => Err(CoreError::invalid_specialization(s)),
        }
    }
}

/// One project in a specialist's portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioProject {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl PortfolioProject {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            images: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the project images, truncated to [`MAX_IMAGES_PER_ITEM`].
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self.images.truncate(MAX_IMAGES_PER_ITEM);
        self
    }
}

fn default_true() -> bool {
    true
}

/// Canonical specialist entity, owned 1:1 by an [`crate::Actor`] with the
/// Specialist role.
///
/// Invariants: at most [`MAX_PORTFOLIO_ITEMS`] portfolio items, each with at
/// most [`MAX_IMAGES_PER_ITEM`] images. Both caps are enforced by truncation
/// at the mutation and reconciliation boundaries, never by error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistProfile {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub specialization: Specialization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub telegram_handle: String,
    /// Contact email, distinct from the login email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default = "default_true")]
    pub visible_in_search: bool,
    #[serde(default)]
    pub portfolio_items: Vec<PortfolioProject>,
}

impl SpecialistProfile {
    /// Creates an empty profile, as produced at registration time.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            specialization: Specialization::default(),
            bio: None,
            telegram_handle: String::new(),
            contact_email: None,
            avatar_url: None,
            visible_in_search: true,
            portfolio_items: Vec::new(),
        }
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn with_specialization(mut self, specialization: Specialization) -> Self {
        self.specialization = specialization;
        self
    }

    /// Replaces the portfolio, truncating to the item and image caps.
    pub fn set_portfolio(&mut self, items: Vec<PortfolioProject>) {
        self.portfolio_items = items;
        self.portfolio_items.truncate(MAX_PORTFOLIO_ITEMS);
        for item in &mut self.portfolio_items {
            item.images.truncate(MAX_IMAGES_PER_ITEM);
        }
    }

    /// The specialist's full name, or `None` when no name is stored.
    pub fn full_name(&self) -> Option<String> {
        let joined = match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (true, true) => return None,
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (false, false) => format!("{} {}", self.first_name, self.last_name),
        };
        Some(joined)
    }

    /// Derived preview image URLs, capped at [`MAX_PREVIEW_IMAGES`].
    pub fn preview_images(&self) -> Vec<String> {
        crate::reconcile::derive_portfolio_preview(&self.portfolio_items)
    }
}
