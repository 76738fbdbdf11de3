//! Signed Cloudinary admin calls (relay side only)

use crema_core::ProviderSettings;
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::hosts::cloudinary::provider_error_message;
use crate::hosts::{HostError, HostResult};

/// Sign API parameters the way Cloudinary expects.
///
/// Parameters are sorted by name, joined as `k=v&k=v`, suffixed with the API
/// secret and hashed with SHA-1.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct CloudinaryAdminClient {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
}

impl CloudinaryAdminClient {
    pub fn new(
        client: Client,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_base: &str,
    ) -> Self {
        Self {
            client,
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from settings, or report which variables are missing
    pub fn from_settings(client: Client, settings: &ProviderSettings) -> HostResult<Self> {
        let mut missing = Vec::new();
        let cloud_name = required(&settings.cloudinary_cloud_name, "CLOUDINARY_CLOUD_NAME", &mut missing);
        let api_key = required(&settings.cloudinary_api_key, "CLOUDINARY_API_KEY", &mut missing);
        let api_secret =
            required(&settings.cloudinary_api_secret, "CLOUDINARY_API_SECRET", &mut missing);

        match (cloud_name, api_key, api_secret) {
            (Some(cloud), Some(key), Some(secret)) => Ok(Self::new(
                client,
                cloud,
                key,
                secret,
                &settings.cloudinary_api_base,
            )),
            _ => Err(HostError::missing(&missing)),
        }
    }

    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    /// Check that the credentials are accepted
    pub async fn ping(&self) -> HostResult<()> {
        let endpoint = format!("{}/v1_1/{}/ping", self.api_base, self.cloud_name);

        let response = self
            .client
            .get(&endpoint)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await
            .map_err(|e| HostError::network(e, "Failed to reach Cloudinary"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = match provider_error_message(&body) {
            Some(msg) => format!("Cloudinary ping failed: {} - {}", status, msg),
            None => format!("Cloudinary ping failed: {}", status),
        };
        Err(HostError::Network {
            message,
            status: Some(status.as_u16()),
            body: Some(body),
        })
    }

    /// Delete an asset by public id; returns the provider's result string
    pub async fn destroy(&self, public_id: &str) -> HostResult<String> {
        self.destroy_at(public_id, chrono::Utc::now().timestamp())
            .await
    }

    async fn destroy_at(&self, public_id: &str, timestamp: i64) -> HostResult<String> {
        let endpoint = format!("{}/v1_1/{}/image/destroy", self.api_base, self.cloud_name);
        let timestamp = timestamp.to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let response = self
            .client
            .post(&endpoint)
            .form(&[
                ("public_id", public_id),
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| HostError::network(e, "Failed to reach Cloudinary"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HostError::network(e, "Failed to read Cloudinary response"))?;

        if !status.is_success() {
            let message = match provider_error_message(&body) {
                Some(msg) => format!("Cloudinary destroy failed: {} - {}", status, msg),
                None => format!("Cloudinary destroy failed: {}", status),
            };
            return Err(HostError::Network {
                message,
                status: Some(status.as_u16()),
                body: Some(body),
            });
        }

        let parsed: DestroyResponse = serde_json::from_str(&body)
            .map_err(|e| HostError::InvalidResponse(format!("destroy response: {}", e)))?;

        tracing::info!(public_id = %public_id, result = %parsed.result, "Cloudinary asset destroyed");
        Ok(parsed.result)
    }
}

fn required(
    value: &Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            missing.push(name);
            None
        }
    }
}
