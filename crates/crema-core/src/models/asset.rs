use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::upload::UploadResult;

/// One logical image as stored on a product or category.
///
/// Never persisted on its own; rebuilt for every render from whichever URL
/// fields the parent entity carries. Empty strings and `None` are treated the
/// same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageAsset {
    pub thumb: Option<String>,
    pub medium: Option<String>,
    pub display: Option<String>,
    pub original: Option<String>,
    /// Single `image_url` column written before size variants existed
    pub legacy: Option<String>,
    pub size: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Where an image is going to be shown, which decides the preferred variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTier {
    /// Table rows and small previews
    Thumbnail,
    /// Menu grid cards
    #[default]
    Card,
    /// Product detail view
    Detail,
}

/// A URL together with its preference (lower is more preferred)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageCandidate {
    pub url: String,
    pub priority: u32,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, priority: u32) -> Self {
        Self {
            url: url.into(),
            priority,
        }
    }
}

/// Outcome of URL selection. Both fields empty means nothing renderable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectedImage {
    pub primary: String,
    pub fallback: String,
}

impl SelectedImage {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Fallback URL only when it differs from the primary
    pub fn distinct_fallback(&self) -> Option<&str> {
        if self.fallback.is_empty() || self.fallback == self.primary {
            None
        } else {
            Some(&self.fallback)
        }
    }
}

impl ImageAsset {
    /// Whether any URL field is non-empty
    pub fn has_any_url(&self) -> bool {
        [
            &self.thumb,
            &self.medium,
            &self.display,
            &self.original,
            &self.legacy,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|url| !url.trim().is_empty()))
    }

    /// Ordered candidate list for `tier`, skipping empty fields
    pub fn candidates(&self, tier: DisplayTier) -> Vec<ImageCandidate> {
        let order: [&Option<String>; 5] = match tier {
            DisplayTier::Thumbnail => [
                &self.thumb,
                &self.medium,
                &self.display,
                &self.original,
                &self.legacy,
            ],
            DisplayTier::Card => [
                &self.medium,
                &self.thumb,
                &self.display,
                &self.original,
                &self.legacy,
            ],
            DisplayTier::Detail => [
                &self.display,
                &self.original,
                &self.medium,
                &self.thumb,
                &self.legacy,
            ],
        };

        order
            .iter()
            .zip(1u32..)
            .filter_map(|(field, priority)| {
                field
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(|url| ImageCandidate::new(url, priority))
            })
            .collect()
    }
}

impl From<&UploadResult> for ImageAsset {
    fn from(result: &UploadResult) -> Self {
        let urls = result.urls.clone().unwrap_or_default();
        Self {
            thumb: urls.thumb,
            medium: urls.medium,
            display: urls.display,
            original: urls.original,
            legacy: result.url.clone(),
            size: result.size,
            width: result.width,
            height: result.height,
        }
    }
}
