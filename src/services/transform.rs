//! Image resizing and re-encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::{AppError, AppResult};
use crate::models::TransformParams;

/// Largest width or height a transform may produce.
pub const MAX_OUTPUT_DIMENSION: u32 = 16_384;

/// Encoded result of a transform.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl TransformedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Formats accepted for upload.
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// Detect the format of an encoded image from its content.
pub fn detect_format(bytes: &[u8]) -> AppResult<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format) if SUPPORTED_FORMATS.contains(&format) => Ok(format),
        Ok(format) => Err(AppError::InvalidInput(format!(
            "Unsupported image format {:?}, expected PNG, JPEG, WebP or GIF",
            format
        ))),
        Err(_) => Err(AppError::InvalidInput(
            "Unrecognized image format".to_string(),
        )),
    }
}

/// Target size after scaling, rounding down and never below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> AppResult<(u32, u32)> {
    let scale_side = |side: u32| -> AppResult<u32> {
        let scaled = (side as f64 * scale).floor();
        if scaled > MAX_OUTPUT_DIMENSION as f64 {
            return Err(AppError::InvalidInput(format!(
                "scaled image would exceed {} pixels per side",
                MAX_OUTPUT_DIMENSION
            )));
        }
        Ok((scaled as u32).max(1))
    };

    Ok((scale_side(width)?, scale_side(height)?))
}

/// Resize an encoded image by `params.scale` and encode it back in its own format.
///
/// `params.quality` only applies to JPEG. CPU bound; call through
/// `spawn_blocking` from async code.
pub fn transform_image(bytes: &[u8], params: TransformParams) -> AppResult<TransformedImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::Image(format!("Failed to read image: {}", e)))?;

    let format = reader
        .format()
        .ok_or_else(|| AppError::Image("Stored file is not a recognized image".to_string()))?;

    let source = reader.decode()?;
    let (width, height) = scaled_dimensions(source.width(), source.height(), params.scale)?;

    let resized = if (width, height) == (source.width(), source.height()) {
        source
    } else {
        source.resize_exact(width, height, FilterType::Lanczos3)
    };

    let bytes = encode(&resized, format, params.quality)?;

    Ok(TransformedImage {
        bytes,
        format,
        width,
        height,
    })
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> AppResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());

    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            rgb.write_with_encoder(encoder)?;
        }
        other => img.write_to(&mut buffer, other)?,
    }

    Ok(buffer.into_inner())
}
