use std::sync::Arc;

use crema_core::{Config, ProviderKind};
use reqwest::Client;

use super::{CloudinaryHost, HostError, HostResult, ImageHost, ImgbbRelayHost};

/// Create the image host selected by `UPLOAD_PROVIDER`.
///
/// Missing provider variables are reported here, before any upload.
pub fn create_image_host(config: &Config, client: Client) -> HostResult<Arc<dyn ImageHost>> {
    let kind = config.upload_provider();

    let missing = config.missing_client_vars(kind);
    if !missing.is_empty() {
        tracing::error!(
            provider = %kind,
            missing = ?missing,
            "Upload provider is not configured"
        );
        return Err(HostError::missing(&missing));
    }

    match kind {
        ProviderKind::Cloudinary => {
            let host =
                CloudinaryHost::from_settings(client, config.providers(), config.upload_timeout());
            tracing::info!(provider = %kind, "Image host initialized");
            Ok(Arc::new(host))
        }
        ProviderKind::Imgbb => {
            tracing::warn!(
                provider = %kind,
                "ImgBB uploads are deprecated; set UPLOAD_PROVIDER=cloudinary"
            );
            let host = ImgbbRelayHost::new(client, config.providers().image_relay_url.clone());
            Ok(Arc::new(host))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crema_core::config::CremaConfig;

    #[test]
    fn test_missing_cloudinary_vars_fail_eagerly() {
        let config = Config::default();
        let err = create_image_host(&config, Client::new()).err().unwrap();
        match err {
            HostError::Configuration { missing } => assert_eq!(
                missing,
                vec!["CLOUDINARY_CLOUD_NAME", "CLOUDINARY_UPLOAD_PRESET"]
            ),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_follows_configuration() {
        let mut inner = CremaConfig::default();
        inner.upload_provider = ProviderKind::Imgbb;
        let host = create_image_host(&Config(Box::new(inner)), Client::new()).unwrap();
        assert_eq!(host.provider(), ProviderKind::Imgbb);

        let mut inner = CremaConfig::default();
        inner.providers.cloudinary_cloud_name = Some("cafe".to_string());
        inner.providers.cloudinary_upload_preset = Some("menu".to_string());
        let host = create_image_host(&Config(Box::new(inner)), Client::new()).unwrap();
        assert_eq!(host.provider(), ProviderKind::Cloudinary);
        assert!(host.missing_config().is_empty());
    }
}
