//! Request logging middleware.
//!
//! Emits one line per finished request under the `api` target. Lines carry
//! the matched route pattern rather than the raw path, plus the `image_key`
//! path parameter, so every request touching one image can be grepped
//! together. Unrouted requests (static assets, 404s) fall back to the path.

use std::future::{Ready, ready};
use std::time::{Duration, Instant};

use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::{StatusCode, header};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, error, info, warn};

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

/// What gets logged once a request has been routed and answered.
struct CompletedRequest {
    method: String,
    route: String,
    image_key: Option<String>,
    status: StatusCode,
    upload_bytes: u64,
    elapsed: Duration,
}

impl CompletedRequest {
    fn from_response(
        req: &HttpRequest,
        status: StatusCode,
        upload_bytes: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            method: req.method().to_string(),
            route: req.match_pattern().unwrap_or_else(|| req.path().to_string()),
            image_key: image_key_of(req),
            status,
            upload_bytes,
            elapsed,
        }
    }

    fn log(&self) {
        let image_key = self.image_key.as_deref().unwrap_or("-");
        let status = self.status.as_u16();

        if self.status.is_server_error() {
            error!(
                target: "api",
                method = %self.method,
                route = %self.route,
                image_key = %image_key,
                status,
                upload_bytes = self.upload_bytes,
                duration_ms = %self.elapsed.as_millis(),
                "request failed"
            );
        } else if self.status.is_client_error() {
            warn!(
                target: "api",
                method = %self.method,
                route = %self.route,
                image_key = %image_key,
                status,
                upload_bytes = self.upload_bytes,
                duration_ms = %self.elapsed.as_millis(),
                "request rejected"
            );
        } else {
            info!(
                target: "api",
                method = %self.method,
                route = %self.route,
                image_key = %image_key,
                status,
                upload_bytes = self.upload_bytes,
                duration_ms = %self.elapsed.as_millis(),
                "request completed"
            );
        }
    }
}

/// `image_key` path parameter of a routed request.
fn image_key_of(req: &HttpRequest) -> Option<String> {
    req.match_info().get("image_key").map(str::to_owned)
}

/// Declared body size; 0 when absent, as for GET and DELETE.
fn declared_body_size(req: &ServiceRequest) -> u64 {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let upload_bytes = declared_body_size(&req);

        debug!(
            target: "api",
            method = %req.method(),
            path = %req.path(),
            query = %req.query_string(),
            remote_addr = %req.connection_info().realip_remote_addr().unwrap_or("unknown"),
            "request received"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let completed = CompletedRequest::from_response(
                res.request(),
                res.status(),
                upload_bytes,
                start.elapsed(),
            );
            completed.log();
            Ok(res)
        })
    }
}
