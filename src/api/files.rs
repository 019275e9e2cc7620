//! Image file API handlers.
//!
//! Serves stored image files, optionally resized and re-encoded.

use actix_web::{HttpResponse, web};
use tracing::{debug, info, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{TransformParams, TransformQuery};
use crate::services::{ImageStorage, TransformedImage, transform_image};

/// Load an image's stored file and apply a transform.
///
/// Returns the storage file name with the transformed bytes.
async fn load_transformed(
    pool: &DbPool,
    storage: &ImageStorage,
    image_key: &str,
    params: TransformParams,
) -> AppResult<(String, TransformedImage)> {
    let image = pool
        .get_image(image_key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image {}", image_key)))?;

    let file_name = image
        .file_name
        .ok_or_else(|| AppError::NotFound(format!("File of image {}", image_key)))?;

    let bytes = storage.read(&file_name).await?;
    debug!(
        "Transforming {} ({} bytes, scale={}, quality={})",
        file_name,
        bytes.len(),
        params.scale,
        params.quality
    );

    let transformed = web::block(move || transform_image(&bytes, params))
        .await
        .map_err(|e| AppError::Image(format!("Transform task failed: {}", e)))??;

    Ok((file_name, transformed))
}

fn image_response(image: TransformedImage) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(image.content_type())
        .body(image.bytes)
}

/// Get an image file, optionally resized.
///
/// The stored file is left untouched.
#[utoipa::path(
    get,
    path = "/images/{image_key}/file",
    tag = "Files",
    params(
        ("image_key" = String, Path, description = "Image key"),
        TransformQuery
    ),
    responses(
        (status = 200, description = "Image bytes in the stored format", content_type = "image/*", body = Vec<u8>),
        (status = 400, description = "Invalid scale or quality", body = crate::error::ErrorResponse),
        (status = 404, description = "Image or file not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_image_file(
    pool: web::Data<DbPool>,
    storage: web::Data<ImageStorage>,
    path: web::Path<String>,
    query: web::Query<TransformQuery>,
) -> AppResult<HttpResponse> {
    let image_key = path.into_inner();
    let params = query.into_inner().into_params()?;

    let (_, transformed) = load_transformed(&pool, &storage, &image_key, params).await?;

    Ok(image_response(transformed))
}

/// Transform an image file and replace the stored copy with the result.
///
/// Each call re-encodes the stored file, so JPEG quality loss compounds.
#[utoipa::path(
    put,
    path = "/images/{image_key}/file",
    tag = "Files",
    params(
        ("image_key" = String, Path, description = "Image key"),
        TransformQuery
    ),
    responses(
        (status = 200, description = "Transformed image bytes, now stored", content_type = "image/*", body = Vec<u8>),
        (status = 400, description = "Invalid scale or quality", body = crate::error::ErrorResponse),
        (status = 404, description = "Image or file not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn rewrite_image_file(
    pool: web::Data<DbPool>,
    storage: web::Data<ImageStorage>,
    path: web::Path<String>,
    query: web::Query<TransformQuery>,
) -> AppResult<HttpResponse> {
    let image_key = path.into_inner();
    let params = query.into_inner().into_params()?;

    let (file_name, transformed) = load_transformed(&pool, &storage, &image_key, params).await?;
    storage.write(&file_name, &transformed.bytes).await?;

    if discard_if_orphaned(&pool, &storage, &image_key, &file_name).await? {
        return Err(AppError::NotFound(format!("Image {}", image_key)));
    }

    info!(
        "Rewrote image file {} for {} ({}x{}, {} bytes)",
        file_name,
        image_key,
        transformed.width,
        transformed.height,
        transformed.bytes.len()
    );

    Ok(image_response(transformed))
}

/// Remove a rewritten file when its image was deleted, or given a new
/// file, while the rewrite ran. Returns `true` when the file was removed.
pub async fn discard_if_orphaned(
    pool: &DbPool,
    storage: &ImageStorage,
    image_key: &str,
    file_name: &str,
) -> AppResult<bool> {
    let still_owned = pool
        .get_image(image_key)
        .await?
        .is_some_and(|image| image.file_name.as_deref() == Some(file_name));
    if still_owned {
        return Ok(false);
    }

    warn!(
        "Image {} changed during rewrite, removing {}",
        image_key, file_name
    );
    storage.remove(file_name).await?;
    Ok(true)
}

/// Configure file routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/images/{image_key}/file")
            .route(web::get().to(get_image_file))
            .route(web::put().to(rewrite_image_file)),
    );
}
