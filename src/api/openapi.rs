//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Annotation Catalog Server",
        version = "0.1.0",
        description = "Catalog of images and their polygon annotations, with image file upload and resizing"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Image endpoints
        api::images::create_image,
        api::images::list_images,
        api::images::delete_image,
        // Annotation endpoints
        api::annotations::create_annotation,
        api::annotations::list_annotations,
        api::annotations::update_annotation,
        // File endpoints
        api::files::get_image_file,
        api::files::rewrite_image_file,
    ),
    components(
        schemas(
            error::ErrorResponse,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::images::ImageUploadForm,
            models::MlTag,
            models::Polygon,
            models::ImageCreate,
            models::ImageRead,
            models::DeleteImageResponse,
            models::AnnotationCreate,
            models::AnnotationUpdate,
            models::AnnotationRead,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Images", description = "Image metadata and upload"),
        (name = "Annotations", description = "Polygon annotations of an image"),
        (name = "Files", description = "Stored image files and resizing")
    )
)]
pub struct ApiDoc;
