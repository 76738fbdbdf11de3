//! Application state shared by the relay handlers.

use std::sync::Arc;

use crema_core::{Config, HostAllowList};
use crema_processing::ImageUploadValidator;
use reqwest::Client;

/// Immutable state behind `Arc`; handlers build provider clients from it
/// per request so a missing secret surfaces as a configuration error.
pub struct AppState {
    pub config: Config,
    pub http: Client,
    pub validator: ImageUploadValidator,
    pub allow_list: HostAllowList,
}

impl AppState {
    pub fn new(config: Config, http: Client) -> Arc<Self> {
        Arc::new(Self {
            validator: ImageUploadValidator::new(config.max_upload_size_bytes()),
            allow_list: HostAllowList::from_config(&config),
            config,
            http,
        })
    }
}
