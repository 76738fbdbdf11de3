//! Upload dispatcher
//!
//! Runs one upload through validation, optional compression and the
//! configured image host, and reduces every outcome to an `UploadResult`.

use std::sync::Arc;

use crema_core::{
    AppError, CompressionPreset, Config, HostAllowList, ImageFile, UploadProgress, UploadResult,
    UploadStage,
};
use crema_processing::{compress_async, CompressionOptions, ImageUploadValidator};
use reqwest::Client;

use crate::hosts::{create_image_host, HostError, HostedImage, ImageHost};

pub struct UploadDispatcher {
    host: Arc<dyn ImageHost>,
    validator: ImageUploadValidator,
    compression: Option<CompressionOptions>,
    allow_list: HostAllowList,
}

impl UploadDispatcher {
    pub fn new(
        host: Arc<dyn ImageHost>,
        validator: ImageUploadValidator,
        compression: Option<CompressionOptions>,
        allow_list: HostAllowList,
    ) -> Self {
        Self {
            host,
            validator,
            compression,
            allow_list,
        }
    }

    /// Build a dispatcher for the provider selected in configuration,
    /// compressing with the upload preset
    pub fn from_config(config: &Config, client: Client) -> Result<Self, HostError> {
        Self::from_config_with_preset(config, client, CompressionPreset::Upload)
    }

    pub fn from_config_with_preset(
        config: &Config,
        client: Client,
        preset: CompressionPreset,
    ) -> Result<Self, HostError> {
        let host = create_image_host(config, client)?;
        let compression = config
            .compression()
            .auto_compress
            .then(|| CompressionOptions::from_settings(config.compression(), preset));

        Ok(Self::new(
            host,
            ImageUploadValidator::new(config.max_upload_size_bytes()),
            compression,
            HostAllowList::from_config(config),
        ))
    }

    pub fn host(&self) -> &Arc<dyn ImageHost> {
        &self.host
    }

    /// Compression applied before upload, `None` when disabled
    pub fn compression(&self) -> Option<&CompressionOptions> {
        self.compression.as_ref()
    }

    pub async fn upload(&self, file: ImageFile) -> UploadResult {
        self.upload_with_progress(file, |_| {}).await
    }

    /// Upload a file, reporting each completed stage to `on_progress`.
    ///
    /// Never panics or returns an error; failures are carried in the result.
    pub async fn upload_with_progress<F>(&self, file: ImageFile, mut on_progress: F) -> UploadResult
    where
        F: FnMut(UploadProgress) + Send,
    {
        match self.run(file, &mut on_progress).await {
            Ok(result) => {
                on_progress(UploadStage::Completed.into());
                result
            }
            Err(err) => {
                match &err {
                    AppError::Validation(_) => {
                        tracing::info!(error = %err, "Upload rejected by validation")
                    }
                    _ => tracing::error!(
                        error = %err.detailed_message(),
                        provider = %self.host.provider(),
                        "Upload failed"
                    ),
                }
                let mut result = UploadResult::failure(&err);
                result.provider = Some(self.host.provider());
                result
            }
        }
    }

    async fn run<F>(&self, file: ImageFile, on_progress: &mut F) -> Result<UploadResult, AppError>
    where
        F: FnMut(UploadProgress) + Send,
    {
        self.validator.validate(&file)?;
        on_progress(UploadStage::Validated.into());

        let missing = self.host.missing_config();
        if !missing.is_empty() {
            return Err(AppError::missing_config(missing));
        }

        let file = self.maybe_compress(file).await;
        on_progress(UploadStage::Compressed.into());

        let hosted = self.host.upload(&file).await?;
        on_progress(UploadStage::Uploaded.into());

        if let Err(reason) = self.allow_list.check(&hosted.url) {
            tracing::warn!(url = %hosted.url, reason = %reason, "Provider URL rejected");
            return Err(AppError::network(
                "Upload provider returned an unrecognized host",
                None,
                None,
            ));
        }

        tracing::info!(
            provider = %self.host.provider(),
            url = %hosted.url,
            size = ?hosted.size,
            "Image uploaded"
        );

        Ok(self.to_result(hosted))
    }

    async fn maybe_compress(&self, file: ImageFile) -> ImageFile {
        let options = match self.compression {
            Some(options) if file.size() > options.skip_below_bytes => options,
            _ => return file,
        };

        let original_size = file.size();
        match compress_async(file.clone(), options).await {
            Ok(compressed) => {
                tracing::debug!(
                    original_size = original_size,
                    compressed_size = compressed.size(),
                    "Image compressed before upload"
                );
                compressed
            }
            Err(e) => {
                tracing::warn!(error = %e, name = %file.name, "Compression failed, uploading original");
                file
            }
        }
    }

    fn to_result(&self, hosted: HostedImage) -> UploadResult {
        UploadResult {
            success: true,
            url: Some(hosted.url),
            urls: Some(hosted.urls),
            error: None,
            error_kind: None,
            provider: Some(self.host.provider()),
            public_id: hosted.public_id,
            delete_url: hosted.delete_url,
            width: hosted.width,
            height: hosted.height,
            size: hosted.size,
            format: hosted.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use crema_core::{ProviderKind, UploadErrorKind, UploadUrls};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

    use crate::hosts::HostResult;

    struct FakeHost {
        calls: AtomicUsize,
        url: String,
        missing: Vec<&'static str>,
        received: Mutex<Option<ImageFile>>,
    }

    impl FakeHost {
        fn new(url: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                url: url.to_string(),
                missing: Vec::new(),
                received: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageHost for FakeHost {
        async fn upload(&self, file: &ImageFile) -> HostResult<HostedImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.received.lock().unwrap() = Some(file.clone());
            Ok(HostedImage {
                url: self.url.clone(),
                urls: UploadUrls {
                    original: Some(self.url.clone()),
                    ..Default::default()
                },
                public_id: Some("menu/latte".to_string()),
                size: Some(file.size() as u64),
                ..Default::default()
            })
        }

        fn missing_config(&self) -> Vec<&'static str> {
            self.missing.clone()
        }

        fn provider(&self) -> ProviderKind {
            ProviderKind::Cloudinary
        }
    }

    const GOOD_URL: &str = "https://res.cloudinary.com/cafe/image/upload/v1/menu/latte.jpg";

    fn dispatcher(host: Arc<FakeHost>, compression: Option<CompressionOptions>) -> UploadDispatcher {
        UploadDispatcher::new(
            host,
            ImageUploadValidator::default(),
            compression,
            HostAllowList::default(),
        )
    }

    fn jpeg(width: u32, height: u32) -> ImageFile {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        }));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        ImageFile::new("latte.jpg", "image/jpeg", Bytes::from(buf.into_inner()))
    }

    #[tokio::test]
    async fn test_non_image_rejected_without_upload() {
        let host = Arc::new(FakeHost::new(GOOD_URL));
        let dispatcher = dispatcher(host.clone(), None);
        let file = ImageFile::new("notes.txt", "text/plain", Bytes::from_static(b"hello"));

        let result = dispatcher.upload(file).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(UploadErrorKind::Validation));
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_with_limit_in_message() {
        let host = Arc::new(FakeHost::new(GOOD_URL));
        let dispatcher = dispatcher(host.clone(), None);
        let file = ImageFile::new(
            "huge.jpg",
            "image/jpeg",
            Bytes::from(vec![0u8; 40 * 1024 * 1024]),
        );

        let result = dispatcher.upload(file).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("32 MB"));
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_reported_in_order() {
        let host = Arc::new(FakeHost::new(GOOD_URL));
        let dispatcher = dispatcher(host.clone(), None);
        let mut seen = Vec::new();

        let result = dispatcher
            .upload_with_progress(jpeg(32, 32), |p| seen.push(p.percent))
            .await;

        assert!(result.success);
        assert_eq!(result.url.as_deref(), Some(GOOD_URL));
        assert_eq!(result.public_id.as_deref(), Some("menu/latte"));
        assert_eq!(seen, vec![20, 40, 80, 100]);
        assert_eq!(host.calls(), 1);
    }

    #[tokio::test]
    async fn test_large_image_is_compressed_before_upload() {
        let host = Arc::new(FakeHost::new(GOOD_URL));
        let options = CompressionOptions {
            max_width: 200,
            max_height: 200,
            quality: 0.8,
            skip_below_bytes: 1,
        };
        let dispatcher = dispatcher(host.clone(), Some(options));
        let file = jpeg(800, 600);
        let original_size = file.size();

        let result = dispatcher.upload(file).await;
        assert!(result.success);

        let sent = host.received.lock().unwrap().clone().unwrap();
        assert!(sent.size() < original_size);
        let (w, h) = crema_processing::decode_dimensions(&sent.data).unwrap();
        assert!(w <= 200 && h <= 200);
    }

    #[tokio::test]
    async fn test_compression_failure_uploads_original() {
        let host = Arc::new(FakeHost::new(GOOD_URL));
        let options = CompressionOptions {
            skip_below_bytes: 1,
            ..CompressionOptions::upload()
        };
        let dispatcher = dispatcher(host.clone(), Some(options));
        // Declared as JPEG but not decodable
        let file = ImageFile::new("broken.jpg", "image/jpeg", Bytes::from_static(b"not really a jpeg"));

        let result = dispatcher.upload(file).await;
        assert!(result.success);
        let sent = host.received.lock().unwrap().clone().unwrap();
        assert_eq!(sent.data, Bytes::from_static(b"not really a jpeg"));
    }

    #[tokio::test]
    async fn test_unrecognized_host_is_network_failure() {
        let host = Arc::new(FakeHost::new("https://evil.example.com/latte.jpg"));
        let dispatcher = dispatcher(host.clone(), None);

        let result = dispatcher.upload(jpeg(16, 16)).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(UploadErrorKind::Network));
        assert!(result.url.is_none());
    }

    #[tokio::test]
    async fn test_missing_configuration_fails_before_upload() {
        let mut fake = FakeHost::new(GOOD_URL);
        fake.missing = vec!["CLOUDINARY_CLOUD_NAME"];
        let host = Arc::new(fake);
        let dispatcher = dispatcher(host.clone(), None);

        let result = dispatcher.upload(jpeg(16, 16)).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(UploadErrorKind::Configuration));
        assert!(result.error.unwrap().contains("CLOUDINARY_CLOUD_NAME"));
        assert_eq!(host.calls(), 0);
    }

    fn cloudinary_config() -> Config {
        let mut inner = crema_core::config::CremaConfig::default();
        inner.providers.cloudinary_cloud_name = Some("cafe".to_string());
        inner.providers.cloudinary_upload_preset = Some("menu".to_string());
        inner.compression.catalog.max_width = 640;
        inner.compression.catalog.quality = 0.6;
        Config(Box::new(inner))
    }

    #[test]
    fn test_from_config_picks_requested_preset() {
        let config = cloudinary_config();

        let upload = UploadDispatcher::from_config(&config, Client::new()).unwrap();
        assert_eq!(upload.compression(), Some(&CompressionOptions::upload()));

        let catalog = UploadDispatcher::from_config_with_preset(
            &config,
            Client::new(),
            CompressionPreset::Catalog,
        )
        .unwrap();
        let options = catalog.compression().unwrap();
        assert_eq!((options.max_width, options.max_height), (640, 1200));
        assert_eq!(options.quality, 0.6);
    }

    #[test]
    fn test_auto_compress_disabled_skips_compression() {
        let mut config = cloudinary_config();
        config.0.compression.auto_compress = false;
        let dispatcher = UploadDispatcher::from_config(&config, Client::new()).unwrap();
        assert!(dispatcher.compression().is_none());
    }
}
