//! Configuration module
//!
//! This module provides configuration structures for the relay service, the
//! upload dispatcher and the CLI: provider credentials, upload limits,
//! compression presets and the image host allow-list.

use std::env;
use std::time::Duration;

use crate::provider_types::ProviderKind;

// Common constants
const SERVER_PORT: u16 = 4000;
const UPLOAD_TIMEOUT_SECS: u64 = 120;
const MAX_UPLOAD_SIZE_MB: usize = 32;
const COMPRESS_THRESHOLD_KB: usize = 1024;
const COMPRESS_MAX_WIDTH: u32 = 1920;
const COMPRESS_MAX_HEIGHT: u32 = 1080;
const COMPRESS_QUALITY: f32 = 0.8;
const CATALOG_COMPRESS_MAX_EDGE: u32 = 1200;
const CATALOG_COMPRESS_QUALITY: f32 = 0.7;
const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";
const IMGBB_API_BASE: &str = "https://api.imgbb.com";
const IMAGE_RELAY_URL: &str = "http://localhost:4000/api/upload-image";

/// Base configuration shared by the service and the CLI
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Credentials and endpoints for both image hosting providers
#[derive(Clone, Debug, Default)]
pub struct ProviderSettings {
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,
    pub cloudinary_api_base: String,
    // Same-origin proxy route; when set, uploads go there instead of the provider
    pub cloudinary_upload_proxy_url: Option<String>,
    pub imgbb_api_key: Option<String>,
    pub imgbb_api_base: String,
    pub image_relay_url: String,
}

/// Named compression preset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionPreset {
    /// Uploads from the admin product form
    #[default]
    Upload,
    /// Category and catalog images, bounded by the long edge
    Catalog,
}

/// Bounds and quality of one preset
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresetSettings {
    pub max_width: u32,
    pub max_height: u32,
    /// Re-encode quality factor in 0.0..=1.0
    pub quality: f32,
}

/// Client-side compression applied before upload
#[derive(Clone, Debug)]
pub struct CompressionSettings {
    pub auto_compress: bool,
    pub threshold_bytes: usize,
    pub upload: PresetSettings,
    pub catalog: PresetSettings,
}

impl CompressionSettings {
    pub fn preset(&self, preset: CompressionPreset) -> &PresetSettings {
        match preset {
            CompressionPreset::Upload => &self.upload,
            CompressionPreset::Catalog => &self.catalog,
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            auto_compress: true,
            threshold_bytes: COMPRESS_THRESHOLD_KB * 1024,
            upload: PresetSettings {
                max_width: COMPRESS_MAX_WIDTH,
                max_height: COMPRESS_MAX_HEIGHT,
                quality: COMPRESS_QUALITY,
            },
            catalog: PresetSettings {
                max_width: CATALOG_COMPRESS_MAX_EDGE,
                max_height: CATALOG_COMPRESS_MAX_EDGE,
                quality: CATALOG_COMPRESS_QUALITY,
            },
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl PresetSettings {
    /// Read `{prefix}MAX_WIDTH`, `{prefix}MAX_HEIGHT` and `{prefix}QUALITY`
    fn from_env(prefix: &str, defaults: PresetSettings) -> Self {
        Self {
            max_width: env_or(&format!("{}MAX_WIDTH", prefix), defaults.max_width),
            max_height: env_or(&format!("{}MAX_HEIGHT", prefix), defaults.max_height),
            quality: env_or(&format!("{}QUALITY", prefix), defaults.quality),
        }
    }
}

/// Full image pipeline configuration
#[derive(Clone, Debug)]
pub struct CremaConfig {
    pub base: BaseConfig,
    pub upload_provider: ProviderKind,
    pub providers: ProviderSettings,
    pub compression: CompressionSettings,
    pub upload_timeout_secs: u64,
    pub max_upload_size_bytes: usize,
    // Backend object-storage host (product images uploaded before the providers existed)
    pub storage_public_host: Option<String>,
    // Extra hosts accepted by the image selector
    // Example: "cdn.example.com,images.example.com"
    pub image_host_allowlist: Vec<String>,
}

impl Default for CremaConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
            },
            upload_provider: ProviderKind::default(),
            providers: ProviderSettings {
                cloudinary_api_base: CLOUDINARY_API_BASE.to_string(),
                imgbb_api_base: IMGBB_API_BASE.to_string(),
                image_relay_url: IMAGE_RELAY_URL.to_string(),
                ..ProviderSettings::default()
            },
            compression: CompressionSettings::default(),
            upload_timeout_secs: UPLOAD_TIMEOUT_SECS,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            storage_public_host: None,
            image_host_allowlist: Vec::new(),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<CremaConfig>);

impl Default for Config {
    fn default() -> Self {
        Config(Box::default())
    }
}

impl Config {
    fn inner(&self) -> &CremaConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.inner().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = CremaConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn upload_provider(&self) -> ProviderKind {
        self.inner().upload_provider
    }

    pub fn providers(&self) -> &ProviderSettings {
        &self.inner().providers
    }

    pub fn compression(&self) -> &CompressionSettings {
        &self.inner().compression
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().upload_timeout_secs)
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn storage_public_host(&self) -> Option<&str> {
        self.inner().storage_public_host.as_deref()
    }

    pub fn image_host_allowlist(&self) -> &[String] {
        &self.inner().image_host_allowlist
    }

    /// Environment variables the browser-side upload path needs for `kind`
    /// that are unset or blank.
    pub fn missing_client_vars(&self, kind: ProviderKind) -> Vec<&'static str> {
        let p = self.providers();
        match kind {
            ProviderKind::Cloudinary => missing(&[
                ("CLOUDINARY_CLOUD_NAME", p.cloudinary_cloud_name.as_deref()),
                (
                    "CLOUDINARY_UPLOAD_PRESET",
                    p.cloudinary_upload_preset.as_deref(),
                ),
            ]),
            ProviderKind::Imgbb => missing(&[("IMAGE_RELAY_URL", Some(&p.image_relay_url))]),
        }
    }

    /// Environment variables the relay service needs for `kind` that are
    /// unset or blank. Secrets only ever appear in this list.
    pub fn missing_relay_vars(&self, kind: ProviderKind) -> Vec<&'static str> {
        let p = self.providers();
        match kind {
            ProviderKind::Cloudinary => missing(&[
                ("CLOUDINARY_CLOUD_NAME", p.cloudinary_cloud_name.as_deref()),
                ("CLOUDINARY_API_KEY", p.cloudinary_api_key.as_deref()),
                ("CLOUDINARY_API_SECRET", p.cloudinary_api_secret.as_deref()),
            ]),
            ProviderKind::Imgbb => missing(&[("IMGBB_API_KEY", p.imgbb_api_key.as_deref())]),
        }
    }
}

fn missing(vars: &[(&'static str, Option<&str>)]) -> Vec<&'static str> {
    vars.iter()
        .filter(|(_, value)| value.map(|v| v.trim().is_empty()).unwrap_or(true))
        .map(|(name, _)| *name)
        .collect()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl CremaConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
        };

        let upload_provider = match env::var("UPLOAD_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => ProviderKind::default(),
        };

        let providers = ProviderSettings {
            cloudinary_cloud_name: non_empty_var("CLOUDINARY_CLOUD_NAME"),
            cloudinary_upload_preset: non_empty_var("CLOUDINARY_UPLOAD_PRESET"),
            cloudinary_api_key: non_empty_var("CLOUDINARY_API_KEY"),
            cloudinary_api_secret: non_empty_var("CLOUDINARY_API_SECRET"),
            cloudinary_api_base: env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| CLOUDINARY_API_BASE.to_string()),
            cloudinary_upload_proxy_url: non_empty_var("CLOUDINARY_UPLOAD_PROXY_URL"),
            imgbb_api_key: non_empty_var("IMGBB_API_KEY"),
            imgbb_api_base: env::var("IMGBB_API_BASE")
                .unwrap_or_else(|_| IMGBB_API_BASE.to_string()),
            image_relay_url: env::var("IMAGE_RELAY_URL")
                .unwrap_or_else(|_| IMAGE_RELAY_URL.to_string()),
        };

        let defaults = CompressionSettings::default();
        let compression = CompressionSettings {
            auto_compress: env::var("AUTO_COMPRESS")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            threshold_bytes: env::var("COMPRESS_THRESHOLD_KB")
                .unwrap_or_else(|_| COMPRESS_THRESHOLD_KB.to_string())
                .parse::<usize>()
                .unwrap_or(COMPRESS_THRESHOLD_KB)
                * 1024,
            upload: PresetSettings::from_env("COMPRESS_", defaults.upload),
            catalog: PresetSettings::from_env("CATALOG_COMPRESS_", defaults.catalog),
        };

        let config = CremaConfig {
            base,
            upload_provider,
            providers,
            compression,
            upload_timeout_secs: env::var("UPLOAD_TIMEOUT_SECS")
                .unwrap_or_else(|_| UPLOAD_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_TIMEOUT_SECS),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_MB")
                .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_UPLOAD_SIZE_MB)
                * 1024
                * 1024,
            storage_public_host: non_empty_var("STORAGE_PUBLIC_HOST")
                .map(|s| s.trim().to_lowercase()),
            image_host_allowlist: env::var("IMAGE_HOST_ALLOWLIST")
                .unwrap_or_default()
                .split(',')
                .map(|domain| domain.trim().to_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (prefix, preset) in [
            ("COMPRESS_", &self.compression.upload),
            ("CATALOG_COMPRESS_", &self.compression.catalog),
        ] {
            if !(0.0..=1.0).contains(&preset.quality) {
                return Err(anyhow::anyhow!(
                    "{}QUALITY must be between 0.0 and 1.0",
                    prefix
                ));
            }

            if preset.max_width == 0 || preset.max_height == 0 {
                return Err(anyhow::anyhow!(
                    "{0}MAX_WIDTH and {0}MAX_HEIGHT must be greater than 0",
                    prefix
                ));
            }
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB cannot be 0"));
        }

        if self.upload_timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPLOAD_TIMEOUT_SECS cannot be 0"));
        }

        for (name, value) in [
            ("CLOUDINARY_API_BASE", &self.providers.cloudinary_api_base),
            ("IMGBB_API_BASE", &self.providers.imgbb_api_base),
            ("IMAGE_RELAY_URL", &self.providers.image_relay_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{} must be a valid URL: {}", name, e))?;
        }

        Ok(())
    }
}
