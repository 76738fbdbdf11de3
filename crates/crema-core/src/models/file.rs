use bytes::Bytes;
use chrono::{DateTime, Utc};

/// An image selected for upload: name, declared MIME type and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
    pub last_modified: DateTime<Utc>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
            last_modified: Utc::now(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lowercased extension of the file name, if any
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Copy carrying new contents and a fresh `last_modified`.
    ///
    /// The name is kept as-is even when the container changes; the new
    /// container is carried by `content_type`.
    pub fn with_contents(&self, data: Bytes, content_type: &str) -> Self {
        Self {
            name: self.name.clone(),
            content_type: content_type.to_string(),
            data,
            last_modified: Utc::now(),
        }
    }
}
