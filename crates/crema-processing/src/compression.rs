use bytes::Bytes;
use crema_core::{AppError, CompressionPreset, CompressionSettings, ImageFile};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),

    #[error("Encoder produced no output")]
    EmptyOutput,
}

impl From<CompressionError> for AppError {
    fn from(err: CompressionError) -> Self {
        AppError::Compression(err.to_string())
    }
}

/// Bounds and quality for one compression call site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Quality factor in 0.0..=1.0
    pub quality: f32,
    /// Inputs smaller than this are returned untouched
    pub skip_below_bytes: usize,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self::upload()
    }
}

impl CompressionOptions {
    /// Default bounds for uploads from the admin product form
    pub fn upload() -> Self {
        Self::from_settings(&CompressionSettings::default(), CompressionPreset::Upload)
    }

    /// Default bounds for category and catalog images
    pub fn catalog() -> Self {
        Self::from_settings(&CompressionSettings::default(), CompressionPreset::Catalog)
    }

    pub fn from_settings(settings: &CompressionSettings, preset: CompressionPreset) -> Self {
        let bounds = settings.preset(preset);
        Self {
            max_width: bounds.max_width,
            max_height: bounds.max_height,
            quality: bounds.quality.clamp(0.0, 1.0),
            skip_below_bytes: settings.threshold_bytes,
        }
    }
}

/// Output container for a compressed image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// JPEG and WebP keep their container; everything else becomes PNG
    pub fn for_source(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => OutputFormat::Jpeg,
            ImageFormat::WebP => OutputFormat::WebP,
            _ => OutputFormat::Png,
        }
    }

    pub fn from_mime_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(OutputFormat::Jpeg),
            "image/png" => Some(OutputFormat::Png),
            "image/webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }
}

/// Largest size within `max_width` x `max_height` keeping the aspect ratio.
///
/// Never upscales; each side is at least 1 pixel.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }

    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);

    if scale >= 1.0 {
        return (width, height);
    }

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (new_width, new_height)
}

fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Decode `data` fully and return its pixel dimensions
pub fn decode_dimensions(data: &[u8]) -> Result<(u32, u32), CompressionError> {
    let img =
        image::load_from_memory(data).map_err(|e| CompressionError::Decode(e.to_string()))?;
    Ok(img.dimensions())
}

/// Pre-upload image compressor
pub struct ImageCompressor;

impl ImageCompressor {
    /// Resize `file` within the option bounds and re-encode it.
    ///
    /// Small inputs are returned byte-identical, and so is any input whose
    /// re-encoded form is not smaller. The file name is always kept.
    pub fn compress(
        file: &ImageFile,
        options: &CompressionOptions,
    ) -> Result<ImageFile, CompressionError> {
        if file.size() < options.skip_below_bytes {
            tracing::debug!(
                name = %file.name,
                size = file.size(),
                threshold = options.skip_below_bytes,
                "Image below compression threshold, skipping"
            );
            return Ok(file.clone());
        }

        let source_format = image::guess_format(&file.data)
            .map_err(|e| CompressionError::Decode(e.to_string()))?;
        let img = image::load_from_memory_with_format(&file.data, source_format)
            .map_err(|e| CompressionError::Decode(e.to_string()))?;

        let (orig_width, orig_height) = img.dimensions();
        let (width, height) =
            fit_within(orig_width, orig_height, options.max_width, options.max_height);
        let resized = (width, height) != (orig_width, orig_height);

        let img = if resized {
            let filter = select_filter(orig_width, orig_height, width, height);
            img.resize_exact(width, height, filter)
        } else {
            img
        };

        let format = OutputFormat::for_source(source_format);
        let encoded = Self::encode(&img, format, options.quality)?;
        if encoded.is_empty() {
            return Err(CompressionError::EmptyOutput);
        }

        // Output is never larger than the input, even after a resize
        if encoded.len() >= file.size() {
            tracing::debug!(
                name = %file.name,
                size = file.size(),
                encoded = encoded.len(),
                resized,
                "Re-encoding did not reduce size, keeping original"
            );
            return Ok(file.clone());
        }

        tracing::info!(
            name = %file.name,
            from_bytes = file.size(),
            to_bytes = encoded.len(),
            from_dimensions = %format!("{}x{}", orig_width, orig_height),
            to_dimensions = %format!("{}x{}", width, height),
            format = format.to_mime_type(),
            "Image compressed"
        );

        Ok(file.with_contents(encoded, format.to_mime_type()))
    }

    fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Bytes, CompressionError> {
        let quality = (quality.clamp(0.0, 1.0) * 100.0).round();
        match format {
            OutputFormat::Jpeg => Self::encode_jpeg(img, quality),
            OutputFormat::Png => Self::encode_png(img),
            OutputFormat::WebP => Self::encode_webp(img, quality),
        }
    }

    /// Encode to JPEG using mozjpeg
    fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<Bytes, CompressionError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp
            .start_compress(Vec::new())
            .map_err(|e| CompressionError::Encode(e.to_string()))?;
        comp.write_scanlines(&rgb_img)
            .map_err(|e| CompressionError::Encode(e.to_string()))?;
        let jpeg_data = comp
            .finish()
            .map_err(|e| CompressionError::Encode(e.to_string()))?;

        Ok(Bytes::from(jpeg_data))
    }

    /// PNG has no quality knob; it is re-encoded losslessly
    fn encode_png(img: &DynamicImage) -> Result<Bytes, CompressionError> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| CompressionError::Encode(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }

    fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Bytes, CompressionError> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality);

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}

/// Run [`ImageCompressor::compress`] on the blocking pool
pub async fn compress_async(
    file: ImageFile,
    options: CompressionOptions,
) -> Result<ImageFile, CompressionError> {
    if file.size() < options.skip_below_bytes {
        return Ok(file);
    }

    tokio::task::spawn_blocking(move || ImageCompressor::compress(&file, &options))
        .await
        .map_err(|e| CompressionError::Encode(format!("compression task failed: {}", e)))?
}
