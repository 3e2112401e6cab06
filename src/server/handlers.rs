//! HTTP request handlers for the resize proxy.
//!
//! This module contains the Axum handlers for the resize endpoint and health checks.
//!
//! # Endpoints
//!
//! - `GET /?url=<source>&width=<pixels>` - Fetch, resize and return an image
//! - `GET /health` - Health check endpoint

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::ResizeError;
use crate::io::ImageFetcher;
use crate::resize::{ImageTransformer, RawResizeParams, ResizeService};

/// Header reporting whether the body came from the response cache.
pub const CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-cache-hit");

/// Message returned for every server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Caller identity used when the peer address is unavailable.
const UNKNOWN_CLIENT: &str = "unknown";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the resize service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F, T> {
    /// The service processing resize requests
    pub resize_service: Arc<ResizeService<F, T>>,

    /// Cache-Control max-age in seconds for successful responses
    pub cache_max_age: u32,
}

impl<F, T> AppState<F, T> {
    /// Create a new application state with the default max-age (1 hour).
    pub fn new(resize_service: ResizeService<F, T>) -> Self {
        Self::with_cache_max_age(resize_service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(resize_service: ResizeService<F, T>, cache_max_age: u32) -> Self {
        Self {
            resize_service: Arc::new(resize_service),
            cache_max_age,
        }
    }
}

impl<F, T> Clone for AppState<F, T> {
    fn clone(&self) -> Self {
        Self {
            resize_service: Arc::clone(&self.resize_service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON body returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `"failed"`
    pub status: &'static str,

    /// Error type identifier (e.g., "invalid_width", "rate_limit_exceeded")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "failed",
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Whole seconds for a `Retry-After` header, rounded up and at least 1.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Convert ResizeError to HTTP response.
///
/// Validation errors describe the caller's own mistake and are returned
/// verbatim. Upstream and transform failures are logged at ERROR level with
/// full detail and answered with a generic message.
impl IntoResponse for ResizeError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ResizeError::MissingParameter { .. } => (StatusCode::BAD_REQUEST, "missing_parameter"),
            ResizeError::InvalidUrl { .. } => (StatusCode::BAD_REQUEST, "invalid_url"),
            ResizeError::InvalidWidth { .. } => (StatusCode::BAD_REQUEST, "invalid_width"),
            ResizeError::WidthTooLarge { .. } => (StatusCode::BAD_REQUEST, "width_too_large"),
            ResizeError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded")
            }
            ResizeError::UpstreamFetch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error"),
            ResizeError::Transform(_) => (StatusCode::INTERNAL_SERVER_ERROR, "transform_error"),
        };

        let message = if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
            INTERNAL_ERROR_MESSAGE.to_string()
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Rejected: {}",
                self
            );
            "Too many requests, please try again later.".to_string()
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
            self.to_string()
        };

        let mut response = (status, Json(ErrorResponse::new(error_type, message))).into_response();

        if let ResizeError::RateLimitExceeded { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }

        response
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Identify the caller for rate limiting.
///
/// Uses the peer IP when the server was started with connect info.
fn client_identity(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Handle resize requests.
///
/// # Endpoint
///
/// `GET /?url=<source>&width=<pixels>`
///
/// # Query Parameters
///
/// - `url`: Absolute http(s) URL of the source image
/// - `width`: Target width in pixels, 1 to the configured maximum (default 2000)
///
/// # Response
///
/// - `200 OK`: JPEG image with `Content-Type: image/jpeg`
/// - `400 Bad Request`: Missing or invalid parameters
/// - `429 Too Many Requests`: Rate limit exhausted, with `Retry-After`
/// - `500 Internal Server Error`: Upstream fetch or resize failed
///
/// # Headers
///
/// - `Content-Type: image/jpeg`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Cache-Hit: true|false`
pub async fn resize_handler<F, T>(
    State(state): State<AppState<F, T>>,
    request: Request,
) -> Result<Response, ResizeError>
where
    F: ImageFetcher + 'static,
    T: ImageTransformer,
{
    let caller = client_identity(&request);
    let params = RawResizeParams::from_query(request.uri().query());

    let result = state.resize_service.handle(params, &caller).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, result.content_type.to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.cache_max_age),
            ),
            (CACHE_HIT_HEADER, result.cache_hit.to_string()),
        ],
        Body::from(result.payload),
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
