//! Annotation API handlers.

use actix_web::{HttpResponse, web};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{AnnotationCreate, AnnotationRead, AnnotationUpdate};

/// Add an annotation to an existing image.
#[utoipa::path(
    post,
    path = "/images/{image_key}/annotations",
    tag = "Annotations",
    params(
        ("image_key" = String, Path, description = "Image key")
    ),
    request_body = AnnotationCreate,
    responses(
        (status = 200, description = "Annotation created", body = AnnotationRead),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Image not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Index already used for this image", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_annotation(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<AnnotationCreate>,
) -> AppResult<HttpResponse> {
    let image_key = path.into_inner();
    let req = body.into_inner();
    req.validate()?;

    let annotation = pool.create_annotation(&image_key, &req).await?;

    Ok(HttpResponse::Ok().json(AnnotationRead::from_entity(annotation)))
}

/// List the annotations of an image, ordered by index.
#[utoipa::path(
    get,
    path = "/images/{image_key}/annotations",
    tag = "Annotations",
    params(
        ("image_key" = String, Path, description = "Image key")
    ),
    responses(
        (status = 200, description = "Annotations of the image", body = Vec<AnnotationRead>),
        (status = 404, description = "Image not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_annotations(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let image_key = path.into_inner();

    let annotations: Vec<AnnotationRead> = pool
        .get_annotations_by_image(&image_key)
        .await?
        .into_iter()
        .map(AnnotationRead::from_entity)
        .collect();

    Ok(HttpResponse::Ok().json(annotations))
}

/// Replace the instrument and polygon of an annotation.
///
/// The index is immutable; a body `index` must match the path.
#[utoipa::path(
    put,
    path = "/images/{image_key}/annotations/{index}",
    tag = "Annotations",
    params(
        ("image_key" = String, Path, description = "Image key"),
        ("index" = i32, Path, description = "Annotation index")
    ),
    request_body = AnnotationUpdate,
    responses(
        (status = 200, description = "Annotation updated", body = AnnotationRead),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Annotation not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn update_annotation(
    pool: web::Data<DbPool>,
    path: web::Path<(String, i32)>,
    body: web::Json<AnnotationUpdate>,
) -> AppResult<HttpResponse> {
    let (image_key, index) = path.into_inner();
    let req = body.into_inner();
    req.validate(index)?;

    let annotation = pool.update_annotation(&image_key, index, &req).await?;

    Ok(HttpResponse::Ok().json(AnnotationRead::from_entity(annotation)))
}

/// Configure annotation routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/images/{image_key}/annotations")
            .route(web::get().to(list_annotations))
            .route(web::post().to(create_annotation)),
    )
    .service(
        web::resource("/images/{image_key}/annotations/{index}")
            .route(web::put().to(update_annotation)),
    );
}
