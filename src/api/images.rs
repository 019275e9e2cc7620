//! Image API handlers.

use actix_multipart::Multipart;
use actix_web::guard::{self, GuardContext};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::db::images::ImageWithAnnotations;
use crate::error::{AppError, AppResult};
use crate::models::{DeleteImageResponse, ImageCreate, ImageFilter, ImageRead};
use crate::services::{ImageStorage, ImageUpload, UploadedFile, read_image_upload};

/// Multipart body of `POST /images`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    /// JSON encoded `ImageCreate`. `metadata` is accepted as an alias.
    image_form: String,
    /// Image file (PNG, JPEG, WebP or GIF).
    #[schema(value_type = String, format = Binary)]
    image_file: Option<Vec<u8>>,
}

/// Create an image with optional inline annotations.
///
/// Accepts a JSON `ImageCreate`, or a multipart form carrying the metadata
/// and the image file. Unknown location and user ids are provisioned with
/// placeholder rows.
#[utoipa::path(
    post,
    path = "/images",
    tag = "Images",
    request_body(
        content(
            (ImageCreate = "application/json"),
            (ImageUploadForm = "multipart/form-data")
        )
    ),
    responses(
        (status = 200, description = "Image created", body = ImageRead),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 409, description = "Image key already exists", body = crate::error::ErrorResponse),
        (status = 413, description = "Image file too large", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_image(
    pool: web::Data<DbPool>,
    body: web::Json<ImageCreate>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let (image, annotations) = pool.create_image(&req, None).await?;

    Ok(HttpResponse::Ok().json(ImageRead::from_entity(image, annotations)))
}

/// Multipart variant of [`create_image`].
pub async fn upload_image(
    pool: web::Data<DbPool>,
    storage: web::Data<ImageStorage>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let ImageUpload { metadata, file } =
        read_image_upload(payload, storage.max_upload_size()).await?;
    metadata.validate()?;

    let Some(file) = file else {
        let (image, annotations) = pool.create_image(&metadata, None).await?;
        return Ok(HttpResponse::Ok().json(ImageRead::from_entity(image, annotations)));
    };

    // Known keys fail fast, before the file is written
    if pool.get_image(&metadata.image_key).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Image {} already exists",
            metadata.image_key
        )));
    }

    let (image, annotations) = create_image_with_file(&pool, &storage, &metadata, &file).await?;
    Ok(HttpResponse::Ok().json(ImageRead::from_entity(image, annotations)))
}

/// Store an uploaded file under a fresh name, then create its image row.
///
/// The file is removed again when the create fails for any reason,
/// including a racing upload that claimed the key first.
pub async fn create_image_with_file(
    pool: &DbPool,
    storage: &ImageStorage,
    metadata: &ImageCreate,
    file: &UploadedFile,
) -> AppResult<ImageWithAnnotations> {
    let file_name = ImageStorage::new_file_name(&metadata.image_key, file.format);
    storage.write(&file_name, &file.bytes).await?;

    match pool.create_image(metadata, Some(file_name.clone())).await {
        Ok(created) => {
            info!(
                "Stored image file for {}: {} ({} bytes)",
                metadata.image_key,
                file_name,
                file.bytes.len()
            );
            Ok(created)
        }
        Err(e) => {
            if let Err(remove_err) = storage.remove(&file_name).await {
                warn!(
                    "Failed to remove {} after failed create: {}",
                    file_name, remove_err
                );
            }
            Err(e)
        }
    }
}

/// List images with their annotations.
///
/// Filters combine with AND; each matches any of its ids. Ids may be given
/// as repeated keys or in bracket form (`user_ids[]=a`).
#[utoipa::path(
    get,
    path = "/images",
    tag = "Images",
    params(ImageFilter),
    responses(
        (status = 200, description = "Matching images ordered by key", body = Vec<ImageRead>),
        (status = 400, description = "Malformed query string", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_images(req: HttpRequest, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let filter = ImageFilter::from_query_str(req.query_string())?;

    let images: Vec<ImageRead> = pool
        .list_images(&filter)
        .await?
        .into_iter()
        .map(|(image, annotations)| ImageRead::from_entity(image, annotations))
        .collect();

    Ok(HttpResponse::Ok().json(images))
}

/// Delete an image, its annotations and its stored file.
#[utoipa::path(
    delete,
    path = "/images/{image_key}",
    tag = "Images",
    params(
        ("image_key" = String, Path, description = "Image key")
    ),
    responses(
        (status = 200, description = "Image deleted", body = DeleteImageResponse),
        (status = 404, description = "Image not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_image(
    pool: web::Data<DbPool>,
    storage: web::Data<ImageStorage>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let image_key = path.into_inner();

    let (image, annotations_deleted) = pool.delete_image(&image_key).await?;

    if let Some(ref file_name) = image.file_name {
        match storage.remove(file_name).await {
            Ok(true) => info!("Removed image file {}", file_name),
            Ok(false) => warn!("Image file {} was already missing", file_name),
            Err(e) => warn!("Failed to remove image file {}: {}", file_name, e),
        }
    }

    Ok(HttpResponse::Ok().json(DeleteImageResponse {
        message: format!(
            "Image {} and {} annotation(s) deleted",
            image_key, annotations_deleted
        ),
        image_key,
        annotations_deleted,
    }))
}

fn is_multipart(ctx: &GuardContext<'_>) -> bool {
    ctx.head()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Configure image routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/images")
            .route(
                web::post()
                    .guard(guard::fn_guard(is_multipart))
                    .to(upload_image),
            )
            .route(web::post().to(create_image))
            .route(web::get().to(list_images)),
    )
    .service(web::resource("/images/{image_key}").route(web::delete().to(delete_image)));
}
