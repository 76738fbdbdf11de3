//! Helpers shared by the `crema` command-line tool.

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use crema_core::ImageFile;

/// MIME type implied by a file extension, `application/octet-stream` when unknown
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Read a file from disk as an upload candidate
pub fn load_image_file(path: &Path) -> anyhow::Result<ImageFile> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    Ok(ImageFile::new(
        name,
        content_type_for_path(path),
        Bytes::from(data),
    ))
}

/// Load `.env`, then initialize tracing, so a `RUST_LOG` from the file applies.
pub fn init_cli() {
    dotenvy::dotenv().ok();
    init_tracing();
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("latte.JPG")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("menu/banner.webp")), "image/webp");
        assert_eq!(content_type_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(
            content_type_for_path(Path::new("README")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_load_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mocha.png");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"\x89PNG fake").unwrap();

        let file = load_image_file(&path).unwrap();
        assert_eq!(file.name, "mocha.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.size(), 9);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = load_image_file(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }

    #[test]
    fn test_log_filter_comes_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=crema_services=trace\n").unwrap();

        dotenvy::from_path_override(&path).unwrap();
        assert!(env_filter().to_string().contains("crema_services=trace"));
    }
}
