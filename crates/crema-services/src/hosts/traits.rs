//! Image host abstraction trait
//!
//! Every upload provider implements `ImageHost`, so the dispatcher never
//! depends on provider details.

use async_trait::async_trait;
use crema_core::{AppError, ImageFile, ProviderKind, UploadUrls};
use thiserror::Error;

/// Image host operation errors
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Missing configuration: {}", .missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("{message}")]
    Network {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    #[error("Upload timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Result type for image host operations
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    pub fn missing(names: &[&str]) -> Self {
        HostError::Configuration {
            missing: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Transport error on a path without an upload deadline; a client
    /// timeout there is a network failure like any other
    pub fn network(err: reqwest::Error, context: &str) -> Self {
        HostError::Network {
            message: format!("{}: {}", context, err),
            status: err.status().map(|s| s.as_u16()),
            body: None,
        }
    }

    /// Classify a transport error under an upload deadline of `timeout_secs`
    pub fn from_reqwest(err: reqwest::Error, context: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            HostError::Timeout {
                seconds: timeout_secs,
            }
        } else {
            Self::network(err, context)
        }
    }
}

impl From<HostError> for AppError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Configuration { missing } => AppError::Configuration { missing },
            HostError::Network {
                message,
                status,
                body,
            } => AppError::Network {
                message,
                status,
                body,
            },
            HostError::Timeout { seconds } => AppError::Timeout { seconds },
            HostError::InvalidResponse(msg) => AppError::network(msg, None, None),
        }
    }
}

/// A successfully stored image, normalized across providers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostedImage {
    pub url: String,
    pub urls: UploadUrls,
    pub public_id: Option<String>,
    pub delete_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: Option<u64>,
    pub format: Option<String>,
}

/// Image host abstraction
///
/// Implementations must never see a provider secret; anything requiring one
/// goes through the relay service.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload a file and return where it can be displayed
    async fn upload(&self, file: &ImageFile) -> HostResult<HostedImage>;

    /// Environment variables this host needs that are unset
    fn missing_config(&self) -> Vec<&'static str>;

    fn provider(&self) -> ProviderKind;
}
