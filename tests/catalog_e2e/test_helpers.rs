//! Shared test helpers for catalog E2E tests.

use std::io::Cursor;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{App, test, web};
use annotation_catalog::api;
use annotation_catalog::config::{DatabaseSettings, StorageSettings};
use annotation_catalog::db::DbPool;
use annotation_catalog::middleware::RequestLogger;
use annotation_catalog::services::ImageStorage;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Default upload limit for tests (1MB).
pub const TEST_MAX_UPLOAD_SIZE: usize = 1024 * 1024;

const BOUNDARY: &str = "catalog-test-boundary";

/// Database, storage and the temp directory backing both.
pub struct TestContext {
    pub pool: DbPool,
    pub storage: ImageStorage,
    _dir: TempDir,
}

/// Create an isolated database and upload directory.
pub async fn setup() -> TestContext {
    setup_with_upload_limit(TEST_MAX_UPLOAD_SIZE).await
}

/// Like [`setup`], with a custom upload size limit.
pub async fn setup_with_upload_limit(max_upload_size: usize) -> TestContext {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let db_path = dir.path().join("catalog.db");
    let pool = DbPool::connect(&DatabaseSettings {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 1,
        min_connections: 1,
    })
    .await
    .expect("Failed to open SQLite database");

    pool.run_migrations()
        .await
        .expect("Failed to run migrations");

    let storage = ImageStorage::new(&StorageSettings {
        upload_dir: dir.path().join("images"),
        max_upload_size,
    })
    .await
    .expect("Failed to create image storage");

    TestContext {
        pool,
        storage,
        _dir: dir,
    }
}

/// Create a test catalog app.
pub async fn create_test_app(
    ctx: &TestContext,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let max_upload_size = ctx.storage.max_upload_size();

    test::init_service(
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::new(ctx.pool.clone()))
            .app_data(web::Data::new(ctx.storage.clone()))
            .configure(|cfg| api::configure_extractors(cfg, max_upload_size))
            .service(web::scope("/api/v1").configure(api::configure_api_routes))
            .configure(api::configure_api_routes),
    )
    .await
}

/// Minimal valid image metadata.
pub fn image_json(image_key: &str) -> Value {
    json!({
        "image_key": image_key,
        "client_id": "client-1",
        "created_at": "2024-01-01T00:00:00Z",
    })
}

/// Annotation body with a unit square polygon.
pub fn annotation_json(index: i32, instrument: &str) -> Value {
    json!({
        "index": index,
        "instrument": instrument,
        "polygon": { "points": [[0, 0], [1, 0], [1, 1], [0, 1]] },
    })
}

async fn read_json(resp: ServiceResponse) -> (u16, Value) {
    let status = resp.status().as_u16();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };
    (status, value)
}

/// GET a JSON endpoint.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    read_json(test::call_service(app, req).await).await
}

/// POST a JSON body.
pub async fn post_json<S>(app: &S, uri: &str, body: &Value) -> (u16, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
    read_json(test::call_service(app, req).await).await
}

/// PUT a JSON body.
pub async fn put_json<S>(app: &S, uri: &str, body: &Value) -> (u16, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::put().uri(uri).set_json(body).to_request();
    read_json(test::call_service(app, req).await).await
}

/// DELETE a resource.
pub async fn delete<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::delete().uri(uri).to_request();
    read_json(test::call_service(app, req).await).await
}

/// Create an image from JSON metadata and assert success.
pub async fn create_image<S>(app: &S, body: &Value) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, created) = post_json(app, "/api/v1/images", body).await;
    assert_eq!(status, 200, "Failed to create image: {}", created);
    created
}

/// Build a multipart body with a metadata part and an optional file part.
pub fn multipart_body(metadata: &Value, file: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image_form\"\r\n\
             Content-Type: application/json\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );

    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image_file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// POST a multipart image upload.
pub async fn upload_image<S>(
    app: &S,
    metadata: &Value,
    file: Option<(&str, &[u8])>,
) -> (u16, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (content_type, body) = multipart_body(metadata, file);
    let req = test::TestRequest::post()
        .uri("/api/v1/images")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    read_json(test::call_service(app, req).await).await
}

/// Call a file endpoint and return status, content type and raw bytes.
pub async fn call_file<S>(app: &S, req: test::TestRequest) -> (u16, String, Bytes)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = test::read_body(resp).await;
    (status, content_type, body)
}

/// Encode a gradient PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode PNG");
    buffer.into_inner()
}

/// Encode a noisy JPEG, so quality visibly changes the output size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 31 % 256) as u8,
            (y * 17 % 256) as u8,
            ((x * y) % 256) as u8,
        ])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .expect("Failed to encode JPEG");
    buffer.into_inner()
}

/// Decode image bytes and return their dimensions.
pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).expect("Response is not a decodable image");
    (img.width(), img.height())
}

/// Number of regular files in the upload directory.
pub fn stored_file_count(ctx: &TestContext) -> usize {
    std::fs::read_dir(ctx.storage.root())
        .expect("Failed to read upload dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .count()
}
