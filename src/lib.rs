//! # Image Resize Proxy
//!
//! An HTTP service that fetches a remote image, scales it to a requested
//! width and returns it as JPEG.
//!
//! Results are cached in memory keyed by source URL and width, so repeated
//! requests are served without touching the upstream. Concurrent requests for
//! the same key share a single fetch and resize. A fixed-window rate limiter
//! sits in front of everything.
//!
//! ## Features
//!
//! - **Width-driven resizing**: Height follows the source aspect ratio
//! - **Response caching**: LRU cache bounded by total bytes with optional TTL
//! - **Single-flight**: Identical concurrent requests trigger one upstream fetch
//! - **Rate limiting**: Global or per-client fixed-window admission
//! - **Bounded upstream**: Fetch timeout and source size limit
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - Upstream image fetching over HTTP
//! - [`resize`] - Rate limiter, validation, cache, transformer and pipeline
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use image_resize_proxy::{create_router, HttpImageFetcher, JpegResizer, ResizeService, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fetcher = HttpImageFetcher::new().expect("HTTP client");
//!     let service = ResizeService::new(fetcher, JpegResizer::new());
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod resize;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::{FetchError, ResizeError, TransformError};
pub use io::{HttpImageFetcher, ImageFetcher};
pub use resize::{
    CacheKey, ImageTransformer, JpegResizer, RateDecision, RateLimitScope, RateLimiter,
    RawResizeParams, ResizeRequest, ResizeResult, ResizeService, ResponseCache,
};
pub use server::{create_router, health_handler, resize_handler, AppState, ErrorResponse, RouterConfig};
