use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::provider_types::ProviderKind;

/// Size-tiered URLs derived from one upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

/// Failure class of an unsuccessful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadErrorKind {
    Validation,
    Configuration,
    Network,
    Timeout,
    Internal,
}

impl From<&AppError> for UploadErrorKind {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Validation(_) | AppError::InvalidInput(_) => UploadErrorKind::Validation,
            AppError::Configuration { .. } => UploadErrorKind::Configuration,
            AppError::Network { .. } | AppError::Render(_) => UploadErrorKind::Network,
            AppError::Timeout { .. } => UploadErrorKind::Timeout,
            AppError::Compression(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => UploadErrorKind::Internal,
        }
    }
}

/// Normalized outcome of an upload, independent of the provider used.
///
/// `success == true` implies `url` is present, non-empty and on an
/// allow-listed host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<UploadUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<UploadErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    /// Provider A identifier, needed for server-side deletion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    /// Provider B one-click deletion page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl UploadResult {
    /// Failed result carrying the client-facing message of `err`
    pub fn failure(err: &AppError) -> Self {
        use crate::error::ErrorMetadata;

        Self {
            success: false,
            error: Some(err.client_message()),
            error_kind: Some(UploadErrorKind::from(err)),
            ..Self::default()
        }
    }

    /// Primary URL, empty when the upload failed
    pub fn primary_url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

/// Discrete upload checkpoints reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    Validated,
    Compressed,
    Uploaded,
    Completed,
}

impl UploadStage {
    pub fn percent(self) -> u8 {
        match self {
            UploadStage::Validated => 20,
            UploadStage::Compressed => 40,
            UploadStage::Uploaded => 80,
            UploadStage::Completed => 100,
        }
    }
}

/// Advisory progress event, not a byte-level stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadProgress {
    pub stage: UploadStage,
    pub percent: u8,
}

impl From<UploadStage> for UploadProgress {
    fn from(stage: UploadStage) -> Self {
        Self {
            stage,
            percent: stage.percent(),
        }
    }
}
