//! Resize service layer.
//!
//! This module provides admission control, validation, caching and the
//! fetch → resize pipeline behind the HTTP endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             Resize Service              │
//! │  ┌─────────────┐  ┌─────────────────┐   │
//! │  │ RateLimiter │  │  ResponseCache  │   │
//! │  └─────────────┘  └─────────────────┘   │
//! │  ┌─────────────────────────────────┐    │
//! │  │   JpegResizer (decode → resize  │    │
//! │  │   → encode)                     │    │
//! │  └─────────────────────────────────┘    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ImageFetcher                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ResizeService`]: Main entry point, orchestrates the full pipeline
//! - [`RateLimiter`]: Fixed-window admission gate
//! - [`ResponseCache`]: LRU cache for encoded results with size and TTL bounds
//! - [`CacheKey`]: Digest of source URL and width
//! - [`JpegResizer`]: Decodes, resizes and re-encodes as JPEG
//! - [`RawResizeParams`]: Query values before validation
//! - [`ResizeResult`]: Response containing payload and metadata

mod cache;
mod limiter;
mod request;
mod service;
mod transformer;

pub use cache::{
    CacheEntry, CacheKey, ResponseCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL,
    DEFAULT_MAX_ENTRIES, JPEG_CONTENT_TYPE,
};
pub use limiter::{
    RateDecision, RateLimitScope, RateLimiter, RateWindow, DEFAULT_MAX_TRACKED_SCOPES,
    DEFAULT_PRUNE_THRESHOLD, DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW,
};
pub use request::{parse_source_url, parse_width, RawResizeParams, ResizeRequest, DEFAULT_MAX_WIDTH};
pub use service::{ResizeResult, ResizeService};
pub use transformer::{
    clamp_quality, scaled_height, ImageTransformer, JpegResizer, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_OUTPUT_PIXELS, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
