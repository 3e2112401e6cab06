use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when retrieving a source image from upstream
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Upstream did not answer within the configured timeout
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// DNS, TLS or connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Upstream answered with a non-success status code
    #[error("Upstream returned status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Response body exceeded the configured limit
    #[error("Response body exceeded the maximum of {limit} bytes")]
    TooLarge { limit: u64 },

    /// Failure while streaming the response body
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Errors that can occur when decoding and re-encoding an image
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// Source bytes are not a decodable image
    #[error("Failed to decode source image: {message}")]
    Decode { message: String },

    /// Resized image could not be encoded
    #[error("Failed to encode resized image: {message}")]
    Encode { message: String },

    /// Requested output exceeds the pixel budget
    #[error("Resize to {width}x{height} exceeds the budget of {max_pixels} pixels")]
    TooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    /// Blocking transform task panicked or was cancelled
    #[error("Transform task failed: {message}")]
    Task { message: String },
}

/// Errors produced by the resize pipeline.
///
/// Every variant is turned into an HTTP response at the server boundary.
#[derive(Debug, Clone, Error)]
pub enum ResizeError {
    /// A required query parameter was absent or empty (HTTP 400)
    #[error("Missing required query parameter: {name}")]
    MissingParameter { name: &'static str },

    /// The `url` parameter is not an absolute http(s) URL (HTTP 400)
    #[error("Invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The `width` parameter is not a positive integer (HTTP 400)
    #[error("Invalid width {value:?}: must be a positive integer")]
    InvalidWidth { value: String },

    /// The `width` parameter exceeds the configured maximum (HTTP 400)
    #[error("Width {width} exceeds the maximum of {max}")]
    WidthTooLarge { width: String, max: u32 },

    /// Admission denied by the rate limiter (HTTP 429)
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    /// Source image could not be retrieved (HTTP 500)
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(#[from] FetchError),

    /// Source image could not be resized (HTTP 500)
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
}
