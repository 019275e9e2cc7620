//! Multipart image upload parsing.
//!
//! An upload carries two parts:
//! - `image_form` (alias `metadata`): JSON `ImageCreate`
//! - `image_file`: the encoded image
//!
//! Parts are buffered in memory up to the configured size limit.

use actix_multipart::{Field, Multipart};
use futures_util::StreamExt;
use image::ImageFormat;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::ImageCreate;
use crate::services::transform::detect_format;

/// Part holding the image bytes.
pub const FILE_PART: &str = "image_file";
/// Part holding the JSON metadata.
pub const METADATA_PART: &str = "image_form";
/// Accepted alias of [`METADATA_PART`].
pub const METADATA_PART_ALIAS: &str = "metadata";

/// Maximum size of the JSON metadata part (1MB).
const MAX_METADATA_SIZE: usize = 1024 * 1024;

/// An uploaded image file.
#[derive(Debug)]
pub struct UploadedFile {
    /// File name sent by the client, without any directory part.
    pub original_name: Option<String>,
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Parsed multipart upload.
#[derive(Debug)]
pub struct ImageUpload {
    pub metadata: ImageCreate,
    pub file: Option<UploadedFile>,
}

/// Read a multipart image upload.
///
/// Fails with `PayloadTooLarge` when the file exceeds `max_file_size` and
/// with `InvalidInput` when the metadata is missing or malformed, or the
/// file is not a supported image. An empty `image_key` is replaced by the
/// uploaded file name.
pub async fn read_image_upload(
    mut payload: Multipart,
    max_file_size: usize,
) -> AppResult<ImageUpload> {
    let mut metadata: Option<ImageCreate> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?;

        let field_name = content_disposition.get_name().unwrap_or_default().to_string();
        let original_name = content_disposition.get_filename().and_then(base_name);

        match field_name.as_str() {
            METADATA_PART | METADATA_PART_ALIAS => {
                let data = read_field(&mut field, MAX_METADATA_SIZE, "Image metadata").await?;
                metadata = Some(serde_json::from_slice(&data)?);
            }
            FILE_PART => {
                let bytes = read_field(&mut field, max_file_size, "Image file").await?;
                if bytes.is_empty() {
                    continue;
                }
                let format = detect_format(&bytes)?;
                info!(
                    "Received image file {:?} ({} bytes, {:?})",
                    original_name,
                    bytes.len(),
                    format
                );
                file = Some(UploadedFile {
                    original_name,
                    bytes,
                    format,
                });
            }
            other => {
                warn!("Ignoring unexpected multipart field '{}'", other);
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
                }
            }
        }
    }

    let mut metadata = metadata.ok_or_else(|| {
        AppError::InvalidInput(format!("Missing multipart field '{}'", METADATA_PART))
    })?;

    if metadata.image_key.trim().is_empty() {
        if let Some(name) = file.as_ref().and_then(|f| f.original_name.clone()) {
            info!("Using uploaded file name '{}' as image_key", name);
            metadata.image_key = name;
        }
    }

    Ok(ImageUpload { metadata, file })
}

/// Buffer one multipart field, enforcing a size limit.
async fn read_field(field: &mut Field, limit: usize, what: &str) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
        if data.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "{} exceeds {} bytes",
                what, limit
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Strip any directory part from a client supplied file name.
fn base_name(filename: &str) -> Option<String> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
