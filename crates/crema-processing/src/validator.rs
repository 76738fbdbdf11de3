use crema_core::{AppError, ImageFile};
use std::path::Path;

const MIB: usize = 1024 * 1024;

/// Upload input validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max_mb} MB)")]
    FileTooLarge { size: usize, max_mb: usize },

    #[error("Not an image: {content_type}")]
    NotAnImage { content_type: String },

    #[error("Unsupported image format: {content_type} (allowed: {})", .allowed.join(", "))]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File extension .{extension} does not match content type {content_type}")]
    ExtensionMismatch {
        extension: String,
        content_type: String,
    },

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Image upload validator
///
/// Runs before any compression or network call; a rejected file never
/// leaves the process.
#[derive(Debug, Clone)]
pub struct ImageUploadValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl Default for ImageUploadValidator {
    fn default() -> Self {
        Self::new(32 * MIB)
    }
}

impl ImageUploadValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self {
            max_file_size,
            allowed_content_types: ["jpeg", "jpg", "png", "gif", "bmp", "webp"]
                .iter()
                .map(|subtype| format!("image/{}", subtype))
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max_mb: self.max_file_size / MIB,
            });
        }

        Ok(())
    }

    /// Validate content type: must be `image/*` and one of the supported formats
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if !normalized.starts_with("image/") {
            return Err(ValidationError::NotAnImage {
                content_type: content_type.to_string(),
            });
        }

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Reject a known image extension that contradicts the declared type.
    ///
    /// Names without an extension, or with one outside the image table, pass.
    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let Some(extension) = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
        else {
            return Ok(());
        };

        let expected: &[&str] = match extension.as_str() {
            "jpg" | "jpeg" => &["image/jpeg", "image/jpg"],
            "png" => &["image/png"],
            "gif" => &["image/gif"],
            "webp" => &["image/webp"],
            "bmp" => &["image/bmp"],
            _ => {
                tracing::debug!(
                    extension = %extension,
                    content_type = %content_type,
                    "Unknown extension, skipping Content-Type/extension cross-validation"
                );
                return Ok(());
            }
        };

        let normalized = content_type.trim().to_lowercase();
        if !expected.iter().any(|ct| *ct == normalized) {
            return Err(ValidationError::ExtensionMismatch {
                extension,
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    /// Validate every aspect of a file selected for upload
    pub fn validate(&self, file: &ImageFile) -> Result<(), ValidationError> {
        self.validate_contents(file)?;
        self.validate_extension_content_type_match(&file.name, &file.content_type)?;
        Ok(())
    }

    /// Type and size only.
    ///
    /// Compressed files keep their original name while `content_type`
    /// follows the new container, so the name is not checked here.
    pub fn validate_contents(&self, file: &ImageFile) -> Result<(), ValidationError> {
        self.validate_content_type(&file.content_type)?;
        self.validate_file_size(file.size())?;
        Ok(())
    }
}
