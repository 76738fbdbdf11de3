//! Provider A: multipart upload with an unsigned upload preset

use std::time::Duration;

use async_trait::async_trait;
use crema_core::{ImageFile, ProviderKind, ProviderSettings, UploadUrls};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::traits::{HostError, HostResult, HostedImage, ImageHost};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Delivery transformations for the derived sizes
const DISPLAY_TRANSFORMATION: &str = "c_limit,w_1200";
const MEDIUM_TRANSFORMATION: &str = "c_limit,w_600";
const THUMB_TRANSFORMATION: &str = "c_limit,w_150";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<String>,
    resource_type: Option<String>,
    bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Insert a delivery transformation right after `/upload/` in a delivery URL.
///
/// URLs that do not look like upload delivery URLs are returned unchanged.
pub fn delivery_url(secure_url: &str, transformation: &str) -> String {
    match secure_url.find("/upload/") {
        Some(idx) => {
            let split = idx + "/upload/".len();
            format!(
                "{}{}/{}",
                &secure_url[..split],
                transformation,
                &secure_url[split..]
            )
        }
        None => secure_url.to_string(),
    }
}

/// Provider error message from a JSON body, if present
pub(crate) fn provider_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|e| e.error.message)
}

pub struct CloudinaryHost {
    client: Client,
    cloud_name: Option<String>,
    upload_preset: Option<String>,
    api_base: String,
    proxy_url: Option<String>,
    timeout: Duration,
}

impl CloudinaryHost {
    pub fn new(client: Client, cloud_name: Option<String>, upload_preset: Option<String>) -> Self {
        Self {
            client,
            cloud_name,
            upload_preset,
            api_base: DEFAULT_API_BASE.to_string(),
            proxy_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_settings(client: Client, settings: &ProviderSettings, timeout: Duration) -> Self {
        Self::new(
            client,
            settings.cloudinary_cloud_name.clone(),
            settings.cloudinary_upload_preset.clone(),
        )
        .with_api_base(&settings.cloudinary_api_base)
        .with_proxy_url(settings.cloudinary_upload_proxy_url.clone())
        .with_timeout(timeout)
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Send uploads to a same-origin proxy route instead of the provider
    pub fn with_proxy_url(mut self, proxy_url: Option<String>) -> Self {
        self.proxy_url = proxy_url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, cloud_name: &str) -> String {
        match &self.proxy_url {
            Some(proxy) => proxy.clone(),
            None => format!("{}/v1_1/{}/image/upload", self.api_base, cloud_name),
        }
    }

    fn credentials(&self) -> HostResult<(&str, &str)> {
        match (self.cloud_name.as_deref(), self.upload_preset.as_deref()) {
            (Some(cloud), Some(preset)) if !cloud.trim().is_empty() && !preset.trim().is_empty() => {
                Ok((cloud, preset))
            }
            _ => Err(HostError::missing(&self.missing_config())),
        }
    }

    /// Send the multipart upload and return the provider's status and body
    /// untouched. The relay's proxy route passes these straight through.
    pub async fn upload_raw(&self, file: &ImageFile) -> HostResult<(u16, String)> {
        let (cloud_name, upload_preset) = self.credentials()?;
        let endpoint = self.endpoint(cloud_name);
        let timeout_secs = self.timeout.as_secs();

        // Shares the file's buffer; the known length keeps the body un-chunked
        let part = Part::stream_with_length(file.data.clone(), file.size() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| HostError::Network {
                message: format!("Invalid content type {}: {}", file.content_type, e),
                status: None,
                body: None,
            })?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", upload_preset.to_string())
            .text("cloud_name", cloud_name.to_string());

        tracing::debug!(
            endpoint = %endpoint,
            name = %file.name,
            size = file.size(),
            "Uploading image to Cloudinary"
        );

        let request = async {
            let response = self
                .client
                .post(&endpoint)
                .multipart(form)
                .send()
                .await
                .map_err(|e| {
                    HostError::from_reqwest(e, "Failed to upload image to Cloudinary", timeout_secs)
                })?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                HostError::from_reqwest(e, "Failed to read Cloudinary response", timeout_secs)
            })?;
            Ok::<_, HostError>((status, body))
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    endpoint = %endpoint,
                    timeout_secs = timeout_secs,
                    "Cloudinary upload aborted after timeout"
                );
                Err(HostError::Timeout {
                    seconds: timeout_secs,
                })
            }
        }
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, file: &ImageFile) -> HostResult<HostedImage> {
        let (status, body) = self.upload_raw(file).await?;

        if !(200..300).contains(&status) {
            let message = match provider_error_message(&body) {
                Some(msg) => format!("Cloudinary upload failed: {} - {}", status, msg),
                None => format!("Cloudinary upload failed: {}", status),
            };
            return Err(HostError::Network {
                message,
                status: Some(status),
                body: Some(body),
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            HostError::InvalidResponse(format!("Failed to parse Cloudinary response: {}", e))
        })?;

        if parsed.secure_url.is_empty() {
            return Err(HostError::InvalidResponse(
                "Cloudinary response has no secure_url".to_string(),
            ));
        }

        if let Some(resource_type) = parsed.resource_type.as_deref() {
            if resource_type != "image" {
                tracing::warn!(
                    resource_type = %resource_type,
                    public_id = %parsed.public_id,
                    "Cloudinary stored upload with unexpected resource type"
                );
            }
        }

        let urls = UploadUrls {
            original: Some(parsed.secure_url.clone()),
            display: Some(delivery_url(&parsed.secure_url, DISPLAY_TRANSFORMATION)),
            medium: Some(delivery_url(&parsed.secure_url, MEDIUM_TRANSFORMATION)),
            thumb: Some(delivery_url(&parsed.secure_url, THUMB_TRANSFORMATION)),
        };

        Ok(HostedImage {
            url: parsed.secure_url,
            urls,
            public_id: Some(parsed.public_id),
            delete_url: None,
            width: parsed.width,
            height: parsed.height,
            size: parsed.bytes,
            format: parsed.format,
        })
    }

    fn missing_config(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.cloud_name.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("CLOUDINARY_CLOUD_NAME");
        }
        if self
            .upload_preset
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
        {
            missing.push("CLOUDINARY_UPLOAD_PRESET");
        }
        missing
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Cloudinary
    }
}
