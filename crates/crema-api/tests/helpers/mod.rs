//! Test helpers: build AppState and router for integration tests.
//!
//! Provider endpoints point at a `mockito` server; nothing leaves the host.

use axum_test::TestServer;
use crema_api::setup::routes;
use crema_api::AppState;
use crema_core::config::CremaConfig;
use crema_core::Config;

pub const CLOUD_NAME: &str = "cafe";
pub const API_KEY: &str = "key";
pub const API_SECRET: &str = "abcd";
pub const IMGBB_KEY: &str = "imgbb-secret";

/// Configuration with every provider variable set, aimed at `provider_base`
pub fn configured(provider_base: &str) -> CremaConfig {
    let mut inner = CremaConfig::default();
    inner.providers.cloudinary_cloud_name = Some(CLOUD_NAME.to_string());
    inner.providers.cloudinary_upload_preset = Some("menu".to_string());
    inner.providers.cloudinary_api_key = Some(API_KEY.to_string());
    inner.providers.cloudinary_api_secret = Some(API_SECRET.to_string());
    inner.providers.cloudinary_api_base = provider_base.to_string();
    inner.providers.imgbb_api_key = Some(IMGBB_KEY.to_string());
    inner.providers.imgbb_api_base = provider_base.to_string();
    inner
}

/// Configuration with no provider secrets at all
pub fn unconfigured() -> CremaConfig {
    CremaConfig::default()
}

pub fn test_server(inner: CremaConfig) -> TestServer {
    let config = Config(Box::new(inner));
    let state = AppState::new(config.clone(), reqwest::Client::new());
    let router = routes::setup_routes(&config, state).expect("router");
    TestServer::new(router).expect("test server")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

    let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([120, 80, 40])));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}
