//! Server-side ImgBB client used by the relay
//!
//! This is the only place the ImgBB key is attached to a request.

use crema_core::{RelayUploadResponse, UploadUrls};
use reqwest::Client;
use serde::{Deserialize, Deserializer};

use crate::hosts::{HostError, HostResult};

#[derive(Debug, Deserialize)]
struct ApiResponse {
    data: Option<ApiImage>,
    #[serde(default)]
    success: bool,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
    display_url: Option<String>,
    delete_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    width: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    height: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    size: Option<u64>,
    image: Option<ApiVariant>,
    medium: Option<ApiVariant>,
    thumb: Option<ApiVariant>,
}

#[derive(Debug, Deserialize)]
struct ApiVariant {
    url: String,
}

/// ImgBB reports dimensions as numbers or numeric strings
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        Text(String),
    }

    Ok(
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(NumberOrString::Number(n)) => Some(n),
            Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
            None => None,
        },
    )
}

/// Strip an optional `data:<mime>;base64,` prefix
pub fn strip_data_url(image: &str) -> &str {
    match image.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => image,
    }
}

pub struct ImgbbApiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl ImgbbApiClient {
    pub fn new(client: Client, api_key: impl Into<String>, api_base: &str) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Upload base64 image data and normalize the provider response
    pub async fn upload_base64(&self, image: &str) -> HostResult<RelayUploadResponse> {
        let endpoint = format!("{}/1/upload", self.api_base);
        let payload = strip_data_url(image);

        let response = self
            .client
            .post(&endpoint)
            .form(&[
                ("key", self.api_key.as_str()),
                ("expiration", "0"),
                ("image", payload),
            ])
            .send()
            .await
            .map_err(|e| HostError::network(e, "Failed to reach ImgBB"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HostError::network(e, "Failed to read ImgBB response"))?;

        let parsed = serde_json::from_str::<ApiResponse>(&body).ok();

        if !status.is_success() {
            let message = match parsed.as_ref().and_then(|p| p.error.as_ref()) {
                Some(err) => format!("ImgBB upload failed: {} - {}", status, err.message),
                None => format!("ImgBB upload failed: {}", status),
            };
            tracing::warn!(status = %status, "ImgBB rejected upload");
            return Err(HostError::Network {
                message,
                status: Some(status.as_u16()),
                body: Some(body),
            });
        }

        let parsed = parsed.ok_or_else(|| {
            HostError::InvalidResponse("ImgBB returned a non-JSON body".to_string())
        })?;

        let data = match (parsed.success, parsed.data) {
            (true, Some(data)) => data,
            _ => {
                return Err(HostError::InvalidResponse(
                    "ImgBB response reported no image".to_string(),
                ))
            }
        };

        Ok(RelayUploadResponse {
            success: true,
            urls: Some(UploadUrls {
                original: Some(
                    data.image
                        .map(|v| v.url)
                        .unwrap_or_else(|| data.url.clone()),
                ),
                display: data.display_url,
                medium: data.medium.map(|v| v.url),
                thumb: data.thumb.map(|v| v.url),
            }),
            url: Some(data.url),
            delete_url: data.delete_url,
            width: data.width.and_then(|w| u32::try_from(w).ok()),
            height: data.height.and_then(|h| u32::try_from(h).ok()),
            size: data.size,
            error: None,
        })
    }
}
