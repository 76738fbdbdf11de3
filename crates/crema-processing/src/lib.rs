//! Crema Image Processing Library
//!
//! Upload input validation and pre-upload compression (resize within bounds
//! and re-encode at a quality factor).

pub mod compression;
pub mod validator;

// Re-export commonly used types
pub use compression::{
    compress_async, decode_dimensions, fit_within, CompressionError, CompressionOptions,
    ImageCompressor, OutputFormat,
};
pub use validator::{ImageUploadValidator, ValidationError};
