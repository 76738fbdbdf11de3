//! Error types module
//!
//! This module provides the core error types used throughout Crema. Upload,
//! compression and display failures from every layer are unified under the
//! `AppError` enum, which knows how to describe itself to HTTP clients and to
//! the upload result shape.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like provider outages
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NETWORK_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing configuration: {}", .missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    #[error("Upload timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Image could not be displayed: {0}")]
    Render(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Choose a JPEG, PNG, GIF, BMP or WebP image up to the size limit"),
            false,
            LogLevel::Debug,
        ),
        AppError::Configuration { .. } => (
            503,
            "CONFIGURATION_ERROR",
            false,
            Some("Set the missing environment variables and restart"),
            false,
            LogLevel::Error,
        ),
        AppError::Network { .. } => (
            502,
            "NETWORK_ERROR",
            true,
            Some("Check the connection and upload again"),
            false,
            LogLevel::Warn,
        ),
        AppError::Timeout { .. } => (
            504,
            "TIMEOUT",
            true,
            Some("Try a smaller image or upload again"),
            false,
            LogLevel::Warn,
        ),
        AppError::Compression(_) => (
            422,
            "COMPRESSION_ERROR",
            false,
            Some("Check image format and try a different file"),
            false,
            LogLevel::Warn,
        ),
        AppError::Render(_) => (
            502,
            "RENDER_ERROR",
            true,
            Some("Re-upload the image"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Network failure carrying the provider's status and raw body
    pub fn network(message: impl Into<String>, status: Option<u16>, body: Option<String>) -> Self {
        AppError::Network {
            message: message.into(),
            status,
            body,
        }
    }

    /// Configuration failure listing the unset environment variables
    pub fn missing_config<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::Configuration {
            missing: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::Configuration { .. } => "Configuration",
            AppError::Network { .. } => "Network",
            AppError::Timeout { .. } => "Timeout",
            AppError::Compression(_) => "Compression",
            AppError::Render(_) => "Render",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        if let AppError::Network {
            body: Some(body), ..
        } = self
        {
            details.push_str(&format!("\n  Provider response: {}", body));
        }

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::Configuration { missing } => format!(
                "Image upload is not configured. Missing environment variables: {}",
                missing.join(", ")
            ),
            AppError::Network {
                message,
                body: Some(body),
                ..
            } => format!("{}: {}", message, body),
            AppError::Network { message, .. } => message.clone(),
            AppError::Timeout { seconds } => {
                format!("Upload timed out after {} seconds", seconds)
            }
            AppError::Compression(ref msg) => msg.clone(),
            AppError::Render(_) => "Image could not be displayed".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
