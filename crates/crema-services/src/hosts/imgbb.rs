//! Provider B: base64 JSON through the same-origin relay
//!
//! The relay holds the provider key; this side only ever sees the relay URL.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crema_core::{ImageFile, ProviderKind, RelayUploadRequest, RelayUploadResponse};
use reqwest::Client;

use super::traits::{HostError, HostResult, HostedImage, ImageHost};

pub struct ImgbbRelayHost {
    client: Client,
    relay_url: String,
}

impl ImgbbRelayHost {
    pub fn new(client: Client, relay_url: impl Into<String>) -> Self {
        Self {
            client,
            relay_url: relay_url.into(),
        }
    }
}

#[async_trait]
impl ImageHost for ImgbbRelayHost {
    async fn upload(&self, file: &ImageFile) -> HostResult<HostedImage> {
        let missing = self.missing_config();
        if !missing.is_empty() {
            return Err(HostError::missing(&missing));
        }

        let request = RelayUploadRequest {
            image: STANDARD.encode(&file.data),
        };

        tracing::debug!(
            relay = %self.relay_url,
            name = %file.name,
            size = file.size(),
            "Uploading image through ImgBB relay"
        );

        let response = self
            .client
            .post(&self.relay_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| HostError::network(e, "Failed to reach image relay"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HostError::network(e, "Failed to read image relay response"))?;

        let parsed = serde_json::from_str::<RelayUploadResponse>(&body).ok();

        if !status.is_success() {
            let message = match parsed.as_ref().and_then(|p| p.error.as_deref()) {
                Some(err) => format!("Image relay upload failed: {} - {}", status, err),
                None => format!("Image relay upload failed: {}", status),
            };
            return Err(HostError::Network {
                message,
                status: Some(status.as_u16()),
                body: Some(body),
            });
        }

        let parsed = parsed.ok_or_else(|| {
            HostError::InvalidResponse("Image relay returned a non-JSON body".to_string())
        })?;

        if !parsed.success {
            return Err(HostError::Network {
                message: parsed
                    .error
                    .unwrap_or_else(|| "Image relay reported failure".to_string()),
                status: Some(status.as_u16()),
                body: Some(body),
            });
        }

        let url = parsed
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| HostError::InvalidResponse("Image relay returned no URL".to_string()))?;

        Ok(HostedImage {
            url,
            urls: parsed.urls.unwrap_or_default(),
            public_id: None,
            delete_url: parsed.delete_url,
            width: parsed.width,
            height: parsed.height,
            size: parsed.size,
            format: None,
        })
    }

    fn missing_config(&self) -> Vec<&'static str> {
        if self.relay_url.trim().is_empty() {
            vec!["IMAGE_RELAY_URL"]
        } else {
            Vec::new()
        }
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Imgbb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_upload_posts_base64_and_maps_relay_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload-image")
            .match_body(Matcher::Json(serde_json::json!({ "image": "aGVsbG8=" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"url":"https://i.ibb.co/abc/latte.jpg",
                    "urls":{"original":"https://i.ibb.co/abc/latte.jpg","thumb":"https://i.ibb.co/xyz/latte.jpg"},
                    "delete_url":"https://ibb.co/abc/del","width":640,"height":480,"size":5120}"#,
            )
            .create_async()
            .await;

        let host = ImgbbRelayHost::new(Client::new(), format!("{}/api/upload-image", server.url()));
        let file = ImageFile::new("latte.jpg", "image/jpeg", Bytes::from_static(b"hello"));
        let hosted = host.upload(&file).await.unwrap();
        mock.assert_async().await;

        assert_eq!(hosted.url, "https://i.ibb.co/abc/latte.jpg");
        assert_eq!(hosted.urls.thumb.as_deref(), Some("https://i.ibb.co/xyz/latte.jpg"));
        assert_eq!(hosted.delete_url.as_deref(), Some("https://ibb.co/abc/del"));
        assert_eq!(hosted.size, Some(5120));
    }

    #[tokio::test]
    async fn test_relay_failure_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/upload-image")
            .with_status(502)
            .with_body(r#"{"success":false,"error":"Invalid API v1 key."}"#)
            .create_async()
            .await;

        let host = ImgbbRelayHost::new(Client::new(), format!("{}/api/upload-image", server.url()));
        let file = ImageFile::new("a.png", "image/png", Bytes::from_static(b"x"));
        match host.upload(&file).await.unwrap_err() {
            HostError::Network { message, status, .. } => {
                assert!(message.contains("Invalid API v1 key."));
                assert_eq!(status, Some(502));
            }
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_timeout_is_network_error() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        });

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let host = ImgbbRelayHost::new(client, format!("http://{}/api/upload-image", addr));
        let file = ImageFile::new("a.png", "image/png", Bytes::from_static(b"x"));

        match host.upload(&file).await.unwrap_err() {
            HostError::Network { message, .. } => {
                assert!(message.contains("Failed to reach image relay"));
            }
            other => panic!("expected network error, got {:?}", other),
        }
    }
}
