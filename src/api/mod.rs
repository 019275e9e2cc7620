//! API endpoint modules.

pub mod annotations;
pub mod files;
pub mod health;
pub mod images;
pub mod openapi;

pub use annotations::configure_routes as configure_annotation_routes;
pub use files::configure_routes as configure_file_routes;
pub use health::configure_health_routes;
pub use images::configure_routes as configure_image_routes;
pub use openapi::ApiDoc;

use actix_web::web;

use crate::error::{json_error_handler, path_error_handler, query_error_handler};

/// Extractor settings that render failures with the standard error body.
pub fn configure_extractors(cfg: &mut web::ServiceConfig, json_limit: usize) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(json_limit)
            .error_handler(json_error_handler),
    )
    .app_data(web::QueryConfig::default().error_handler(query_error_handler))
    .app_data(web::PathConfig::default().error_handler(path_error_handler));
}

/// Mount every catalog route. Served at the root and again under `/api/v1`.
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_image_routes)
        .configure(configure_annotation_routes)
        .configure(configure_file_routes);
}
