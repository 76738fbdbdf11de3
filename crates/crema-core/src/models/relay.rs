use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::upload::UploadUrls;

/// Body of `POST /api/upload-image`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelayUploadRequest {
    /// Base64 image contents, optionally as a `data:` URL
    pub image: String,
}

/// Normalized Provider B upload as returned by the relay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelayUploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<UploadUrls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
