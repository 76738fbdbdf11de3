//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use crema_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{
    API_PREFIX, BASE64_BODY_OVERHEAD_DEN, BASE64_BODY_OVERHEAD_NUM,
    DEFAULT_HTTP_CONCURRENCY_LIMIT,
};
use crate::handlers;
use crate::state::AppState;

const ENVELOPE_ALLOWANCE: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT)
        .max(1);

    // Relay bodies carry the image base64-encoded
    let body_limit = config.max_upload_size_bytes() / BASE64_BODY_OVERHEAD_DEN
        * BASE64_BODY_OVERHEAD_NUM
        + ENVELOPE_ALLOWANCE;

    tracing::info!(
        http_concurrency_limit,
        body_limit,
        "HTTP limits configured"
    );

    let api_routes = Router::new()
        .route("/upload-image", post(handlers::upload_image::upload_image))
        .route("/cloudinary/ping", get(handlers::cloudinary::ping))
        .route("/cloudinary/destroy", post(handlers::cloudinary::destroy))
        .route("/cloudinary/upload", post(handlers::cloudinary::upload_proxy))
        .route(
            "/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        );

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .nest(API_PREFIX, api_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        if config.is_production() {
            anyhow::bail!("CORS_ORIGINS cannot be '*' in production");
        }
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crema_core::config::CremaConfig;

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut inner = CremaConfig::default();
        inner.base.environment = "production".to_string();
        let config = Config(Box::new(inner));
        let err = setup_cors(&config).unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));

        assert!(setup_cors(&Config::default()).is_ok());
    }

    #[test]
    fn test_explicit_origins_allowed_in_production() {
        let mut inner = CremaConfig::default();
        inner.base.environment = "prod".to_string();
        inner.base.cors_origins = vec!["https://cafe.example.com".to_string()];
        assert!(setup_cors(&Config(Box::new(inner))).is_ok());
    }
}
