//! Resilient image loading
//!
//! Drives an `ImageLoadState` against real fetches: each `Load` effect is
//! fetched under the stall timeout and the outcome is fed back as an event.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use crema_core::{DisplayEffect, DisplayEvent, ImageLoadState, RenderError, SelectedImage, STALL_TIMEOUT};
use crema_processing::decode_dimensions;
use reqwest::Client;

/// Loads an image and reports its decoded dimensions
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<(u32, u32)>;
}

pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<(u32, u32)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to request image")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Image request failed: {}", status);
        }

        let data = response.bytes().await.context("Failed to read image body")?;

        let dimensions = tokio::task::spawn_blocking(move || decode_dimensions(&data))
            .await
            .context("Decode task failed")??;
        Ok(dimensions)
    }
}

type ErrorCallback = Arc<dyn Fn(&RenderError) + Send + Sync>;

pub struct ResilientImageLoader {
    fetcher: Arc<dyn ImageFetcher>,
    stall_timeout: Duration,
    on_error: Option<ErrorCallback>,
}

impl ResilientImageLoader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            stall_timeout: STALL_TIMEOUT,
            on_error: None,
        }
    }

    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    /// Callback invoked at most once per load when display fails for good
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RenderError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Load `image` until it is displayed or the placeholder is shown
    pub async fn load(&self, image: &SelectedImage) -> ImageLoadState {
        let (mut state, mut effects) = ImageLoadState::start(
            image.primary.clone(),
            image.distinct_fallback().map(str::to_string),
        );

        loop {
            let mut next = None;
            for effect in effects.drain(..) {
                match effect {
                    DisplayEffect::Load(url) => next = Some(url),
                    DisplayEffect::ShowPlaceholder => {
                        tracing::debug!(primary = %image.primary, "Showing placeholder")
                    }
                    DisplayEffect::NotifyError(err) => {
                        if let Some(callback) = &self.on_error {
                            callback(&err);
                        }
                    }
                }
            }

            let Some(url) = next else {
                break;
            };

            let event = match tokio::time::timeout(self.stall_timeout, self.fetcher.fetch(&url)).await
            {
                Ok(Ok((width, height))) => {
                    tracing::debug!(url = %url, width, height, "Image loaded");
                    DisplayEvent::Loaded
                }
                Ok(Err(e)) => {
                    tracing::debug!(url = %url, error = %e, "Image load failed");
                    DisplayEvent::Failed
                }
                Err(_) => {
                    tracing::debug!(url = %url, "Image load stalled");
                    DisplayEvent::StallTimeout
                }
            };

            effects = state.apply(event);
        }

        state
    }
}
