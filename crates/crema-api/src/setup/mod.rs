//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use crema_core::{Config, ProviderKind};

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    crate::telemetry::init_telemetry(json_logs);

    tracing::info!(
        environment = %config.environment(),
        provider = %config.upload_provider(),
        "Configuration loaded and validated successfully"
    );
    report_missing_secrets(&config);

    let http = reqwest::Client::builder()
        .user_agent(concat!("crema-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let state = AppState::new(config.clone(), http);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Routes answer with a configuration error when their secrets are unset;
/// warn at startup so operators see it before the first request.
fn report_missing_secrets(config: &Config) {
    for kind in [ProviderKind::Cloudinary, ProviderKind::Imgbb] {
        let missing = config.missing_relay_vars(kind);
        if !missing.is_empty() {
            tracing::warn!(
                provider = %kind,
                missing = %missing.join(", "),
                "Relay routes for provider are not configured"
            );
        }
    }
}
