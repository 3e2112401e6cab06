//! Resize Service for orchestrating the request pipeline.
//!
//! The ResizeService is the main entry point for resize requests. It orchestrates:
//! - Admission control
//! - Request validation
//! - Cache lookups
//! - Upstream fetch and resize, deduplicated per key
//! - Result caching
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ResizeService                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                     handle()                            │    │
//! │  │  1. Admit            4. Join or lead in-flight work     │    │
//! │  │  2. Validate params  5. Fetch, then resize              │    │
//! │  │  3. Check cache      6. Cache & return                  │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │      │              │                │                 │        │
//! │      ▼              ▼                ▼                 ▼        │
//! │ ┌───────────┐ ┌─────────────┐ ┌──────────────┐ ┌──────────────┐ │
//! │ │RateLimiter│ │ResponseCache│ │ ImageFetcher │ │ Transformer  │ │
//! │ └───────────┘ └─────────────┘ └──────────────┘ └──────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::error::{ResizeError, TransformError};
use crate::io::ImageFetcher;

use super::cache::{CacheKey, ResponseCache, JPEG_CONTENT_TYPE};
use super::limiter::{RateDecision, RateLimiter};
use super::request::{RawResizeParams, ResizeRequest, DEFAULT_MAX_WIDTH};
use super::transformer::ImageTransformer;

// =============================================================================
// Resize Result
// =============================================================================

/// Response from the resize service.
#[derive(Debug, Clone)]
pub struct ResizeResult {
    /// The encoded image
    pub payload: Bytes,

    /// MIME type of the payload
    pub content_type: &'static str,

    /// Whether this result was served from cache
    pub cache_hit: bool,
}

// =============================================================================
// In-flight Tracking
// =============================================================================

type InFlightMap = Mutex<HashMap<CacheKey, Arc<Notify>>>;

/// Releases a leader's in-flight slot and wakes its waiters.
///
/// Runs on drop so that a failed or cancelled leader never strands the
/// requests waiting behind it. The guard is owned so it can move into the
/// detached transform task.
struct InFlightGuard {
    in_flight: Arc<InFlightMap>,
    key: CacheKey,
    notify: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
        self.notify.notify_waiters();
    }
}

// =============================================================================
// Resize Service
// =============================================================================

/// Service that fetches, resizes and caches images.
///
/// All shared state (limiter counters, cache, in-flight map) lives inside
/// the service, so tests can build isolated instances.
///
/// # Type Parameters
///
/// * `F` - Upstream fetcher
/// * `T` - Image transformer
///
/// # Example
///
/// ```ignore
/// use image_resize_proxy::io::HttpImageFetcher;
/// use image_resize_proxy::resize::{JpegResizer, RawResizeParams, ResizeService};
///
/// let service = ResizeService::new(HttpImageFetcher::new()?, JpegResizer::new());
///
/// let params = RawResizeParams::new("https://example.com/cat.png", "320");
/// let result = service.handle(params, "127.0.0.1").await?;
///
/// println!("{} bytes, cache hit: {}", result.payload.len(), result.cache_hit);
/// ```
pub struct ResizeService<F, T> {
    fetcher: F,
    transformer: Arc<T>,
    cache: Arc<ResponseCache>,
    limiter: RateLimiter,
    max_width: u32,
    in_flight: Arc<InFlightMap>,
}

impl<F, T> ResizeService<F, T>
where
    F: ImageFetcher,
    T: ImageTransformer,
{
    /// Create a service with default cache, limiter and maximum width.
    pub fn new(fetcher: F, transformer: T) -> Self {
        Self {
            fetcher,
            transformer: Arc::new(transformer),
            cache: Arc::new(ResponseCache::new()),
            limiter: RateLimiter::new(),
            max_width: DEFAULT_MAX_WIDTH,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replace the response cache.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Replace the rate limiter.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Set the largest accepted width.
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    /// Get the largest accepted width.
    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Handle one inbound request.
    ///
    /// `caller` identifies the client for per-client rate limiting; it is
    /// ignored by a global limiter.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The rate limit is exhausted (checked before anything else)
    /// - `url` or `width` is missing or malformed
    /// - The source cannot be fetched or resized
    pub async fn handle(
        &self,
        params: RawResizeParams,
        caller: &str,
    ) -> Result<ResizeResult, ResizeError> {
        if let RateDecision::Denied { retry_after } = self.limiter.admit(caller) {
            return Err(ResizeError::RateLimitExceeded { retry_after });
        }

        let request = params.validate(self.max_width)?;
        self.resize(&request).await
    }

    /// Serve a validated request from cache, or fetch and resize it.
    ///
    /// Bypasses the rate limiter.
    pub async fn resize(&self, request: &ResizeRequest) -> Result<ResizeResult, ResizeError> {
        let key = CacheKey::new(request.source_url.as_str(), request.target_width);

        loop {
            if let Some(payload) = self.cache.get(&key).await {
                debug!(key = %key, "Cache hit");
                return Ok(ResizeResult {
                    payload,
                    content_type: JPEG_CONTENT_TYPE,
                    cache_hit: true,
                });
            }

            // Join an in-flight computation or become its leader
            let leader = {
                let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());

                if let Some(pending) = in_flight.get(&key).cloned() {
                    Err(pending)
                } else {
                    let notify = Arc::new(Notify::new());
                    in_flight.insert(key.clone(), Arc::clone(&notify));
                    Ok(notify)
                }
            };

            let notify = match leader {
                Ok(notify) => notify,
                Err(pending) => {
                    // A Notified future sees notify_waiters() from creation on,
                    // so register first and only then re-check the slot
                    let notified = pending.notified();
                    if self.is_in_flight(&key, &pending) {
                        debug!(key = %key, "Waiting for in-flight resize");
                        notified.await;
                    }
                    continue;
                }
            };

            let guard = InFlightGuard {
                in_flight: Arc::clone(&self.in_flight),
                key,
                notify,
            };

            let payload = self.generate(request, guard).await?;

            return Ok(ResizeResult {
                payload,
                content_type: JPEG_CONTENT_TYPE,
                cache_hit: false,
            });
        }
    }

    fn is_in_flight(&self, key: &CacheKey, notify: &Arc<Notify>) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, notify))
    }

    /// Fetch the source, then resize and cache it in a detached task.
    ///
    /// The fetch runs on the caller's task, so cancelling the caller aborts
    /// it and releases the slot. Once the source is in hand the transform
    /// task owns the in-flight slot: it always finishes, caches the result
    /// and only then wakes the waiters, even if the caller went away.
    async fn generate(
        &self,
        request: &ResizeRequest,
        guard: InFlightGuard,
    ) -> Result<Bytes, ResizeError> {
        let source = self.fetcher.fetch(&request.source_url).await?;

        let transformer = Arc::clone(&self.transformer);
        let cache = Arc::clone(&self.cache);
        let width = request.target_width;
        let source_len = source.len();

        let task = tokio::spawn(async move {
            let payload = tokio::task::spawn_blocking(move || transformer.resize(&source, width))
                .await
                .map_err(|e| TransformError::Task {
                    message: e.to_string(),
                })??;

            cache.put(guard.key.clone(), payload.clone()).await;
            Ok::<_, TransformError>(payload)
        });

        let payload = task.await.map_err(|e| TransformError::Task {
            message: e.to_string(),
        })??;

        info!(
            url = %request.source_url,
            width,
            source_bytes = source_len,
            output_bytes = payload.len(),
            "Resized image"
        );

        Ok(payload)
    }

    /// Get cache statistics.
    ///
    /// Returns `(current_size, capacity, entry_count)`.
    pub async fn cache_stats(&self) -> (usize, usize, usize) {
        let size = self.cache.size().await;
        let capacity = self.cache.capacity();
        let count = self.cache.len().await;
        (size, capacity, count)
    }

    /// Clear the response cache.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Get a reference to the response cache.
    pub fn cache(&self) -> &ResponseCache {
        self.cache.as_ref()
    }

    /// Get a reference to the rate limiter.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

// =============================================================================
// Tests
// =============================================================================
