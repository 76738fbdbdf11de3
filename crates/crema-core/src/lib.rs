//! Crema Core Library
//!
//! This crate provides the domain models, error types, configuration, URL
//! selection and the image display state machine shared by every Crema
//! component.

pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod provider_types;
pub mod selector;

// Re-export commonly used types
pub use config::{
    CompressionPreset, CompressionSettings, Config, PresetSettings, ProviderSettings,
};
pub use display::{
    DisplayEffect, DisplayEvent, DisplayPhase, ImageLoadState, RenderError, MAX_RETRIES,
    STALL_TIMEOUT,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    DisplayTier, ImageAsset, ImageCandidate, ImageFile, RelayUploadRequest, RelayUploadResponse,
    SelectedImage, UploadErrorKind, UploadProgress, UploadResult, UploadStage, UploadUrls,
};
pub use provider_types::ProviderKind;
pub use selector::{select_for_asset, select_image, HostAllowList};
