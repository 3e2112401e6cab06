//! Test utilities for integration tests.
//!
//! This module provides a mock upstream fetcher and helpers for building
//! source images, routers and requests.

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use tower::ServiceExt;
use url::Url;

use image_resize_proxy::error::FetchError;
use image_resize_proxy::io::ImageFetcher;
use image_resize_proxy::resize::{JpegResizer, ResizeService};
use image_resize_proxy::{create_router, RouterConfig};

/// URL served by [`MockFetcher::with_default_image`].
pub const CAT_URL: &str = "https://images.test/cat.jpg";

// =============================================================================
// Mock Fetcher with Request Tracking
// =============================================================================

/// A mock upstream that serves pre-configured images and counts fetches.
///
/// Unknown URLs answer with an upstream 404.
pub struct MockFetcher {
    images: HashMap<String, Bytes>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Duration,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            fetch_counts: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Serve a 64x48 JPEG at [`CAT_URL`].
    pub fn with_default_image() -> Self {
        Self::new().with_image(CAT_URL, create_test_jpeg(64, 48))
    }

    pub fn with_image(mut self, url: impl Into<String>, data: Vec<u8>) -> Self {
        self.images.insert(url.into(), Bytes::from(data));
        self
    }

    /// Sleep before answering each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetches across all URLs.
    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Number of fetches for one URL.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetch_counts
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .fetch_counts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.images
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

pub type MockService = ResizeService<Arc<MockFetcher>, JpegResizer>;

/// Build a service around a shared mock so tests can inspect its counters.
pub fn mock_service(fetcher: &Arc<MockFetcher>) -> MockService {
    ResizeService::new(Arc::clone(fetcher), JpegResizer::new())
}

/// Build a router with tracing disabled.
pub fn test_router(service: MockService) -> Router {
    create_router(service, RouterConfig::new().with_tracing(false))
}

/// Build the query URI for a resize request.
pub fn resize_uri(url: &str, width: &str) -> String {
    format!("/?url={}&width={}", url, width)
}

/// Send a GET request through a clone of the router.
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Send a GET request that appears to come from `peer`.
pub async fn get_from(router: &Router, uri: &str, peer: [u8; 4]) -> Response<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// =============================================================================
// Test Image Creation
// =============================================================================

/// Create an RGB JPEG with a gradient pattern.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 128])
    });

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    encoder.encode_image(&img).unwrap();
    buf
}

/// Create a PNG with an alpha channel.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| Rgba([255, 0, 0, (x % 256) as u8]));

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Create a 1-pixel-wide grayscale PNG; it compresses to a few hundred bytes.
pub fn create_tall_png(height: u32) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(1, height, image::Luma([200]));

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Check that data starts with a JPEG SOI marker and ends with EOI.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[..2] == [0xFF, 0xD8] && data[data.len() - 2..] == [0xFF, 0xD9]
}

/// Decode an image and return its dimensions.
pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}
