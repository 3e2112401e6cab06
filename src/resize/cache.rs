//! Response cache for resized images.
//!
//! This module provides an LRU cache for encoded resize results, so that
//! repeated requests for the same source and width skip both the upstream
//! fetch and the decode/resize/encode cycle.
//!
//! # Cache Key
//!
//! Entries are keyed by a SHA-256 digest over:
//! - The source URL (length-prefixed)
//! - The target width
//!
//! # Eviction
//!
//! The cache tracks the total size of cached payloads in bytes and evicts
//! least-recently-used entries when the capacity is exceeded. Entries older
//! than the configured time-to-live are treated as absent and dropped on
//! lookup.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Content type of every cached payload.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Default cache capacity: 100MB
pub const DEFAULT_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Default time-to-live for cached entries (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of entries (to bound LRU overhead)
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for resize results.
///
/// Derived deterministically from `(source_url, width)`. The URL is
/// length-prefixed before hashing so that no two distinct pairs feed the
/// same byte sequence to the digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: Arc<str>,
}

impl CacheKey {
    /// Derive the key for a source URL and target width.
    pub fn new(source_url: &str, width: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((source_url.len() as u64).to_be_bytes());
        hasher.update(source_url.as_bytes());
        hasher.update(width.to_be_bytes());

        Self {
            digest: hex::encode(hasher.finalize()).into(),
        }
    }

    /// Get the hex-encoded digest.
    pub fn as_str(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// A stored resize result.
///
/// Entries are never mutated in place; re-insertion replaces them.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded image bytes
    pub payload: Bytes,

    /// MIME type of the payload (always JPEG)
    pub content_type: &'static str,

    /// When the entry was stored
    pub inserted_at: Instant,
}

// =============================================================================
// Response Cache
// =============================================================================

/// LRU cache for resized images with size-based capacity and optional TTL.
///
/// # Thread Safety
///
/// The cache is thread-safe and can be shared across async tasks via `Arc`.
///
/// # Example
///
/// ```
/// use image_resize_proxy::resize::{CacheKey, ResponseCache};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = ResponseCache::new();
///
///     let key = CacheKey::new("https://example.com/cat.png", 320);
///     let payload = Bytes::from(vec![0xFF, 0xD8, 0xFF, 0xE0]); // JPEG header
///
///     cache.put(key.clone(), payload.clone()).await;
///     assert_eq!(cache.get(&key).await, Some(payload));
/// }
/// ```
pub struct ResponseCache {
    /// The underlying LRU cache
    cache: RwLock<LruCache<CacheKey, CacheEntry>>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Entry lifetime; `None` disables expiry
    ttl: Option<Duration>,

    /// Current total size in bytes
    current_size: RwLock<usize>,
}

impl ResponseCache {
    /// Create a new cache with default capacity (100MB) and TTL (1 hour).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new cache with the specified capacity in bytes and the default TTL.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_config(max_size, DEFAULT_MAX_ENTRIES, Some(DEFAULT_CACHE_TTL))
    }

    /// Create a new cache with explicit capacity, entry limit and TTL.
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum total size of cached payloads in bytes
    /// * `max_entries` - Maximum number of entries (clamped to at least 1)
    /// * `ttl` - Entry lifetime, or `None` to keep entries until evicted
    pub fn with_config(max_size: usize, max_entries: usize, ttl: Option<Duration>) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(max_entries)),
            max_size,
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
            current_size: RwLock::new(0),
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl.is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    /// Get a payload from the cache.
    ///
    /// Returns `Some(data)` if a live entry exists, `None` otherwise.
    /// This operation marks the entry as recently used and drops it if it
    /// has expired.
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        self.get_entry(key).await.map(|entry| entry.payload)
    }

    /// Get the full entry for a key, honoring expiry.
    pub async fn get_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut cache = self.cache.write().await;

        let expired = match cache.get(key) {
            Some(entry) if !self.is_expired(entry) => return Some(entry.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some(stale) = cache.pop(key) {
                let mut current_size = self.current_size.write().await;
                *current_size = current_size.saturating_sub(stale.payload.len());
            }
        }

        None
    }

    /// Check if a live entry exists without updating LRU order.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let cache = self.cache.read().await;
        cache.peek(key).is_some_and(|entry| !self.is_expired(entry))
    }

    /// Store a payload in the cache.
    ///
    /// If the key already exists, the entry is replaced and marked as
    /// recently used. Least-recently-used entries are evicted until the
    /// cache is within capacity.
    pub async fn put(&self, key: CacheKey, payload: Bytes) {
        let data_size = payload.len();
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old) = cache.peek(&key) {
            *current_size = current_size.saturating_sub(old.payload.len());
        }

        let entry = CacheEntry {
            payload,
            content_type: JPEG_CONTENT_TYPE,
            inserted_at: Instant::now(),
        };

        // Entry-count eviction hands back the displaced LRU entry
        if let Some((evicted_key, evicted)) = cache.push(key.clone(), entry) {
            if evicted_key != key {
                *current_size = current_size.saturating_sub(evicted.payload.len());
            }
        }
        *current_size += data_size;

        while *current_size > self.max_size {
            if let Some((_, evicted)) = cache.pop_lru() {
                *current_size = current_size.saturating_sub(evicted.payload.len());
            } else {
                break;
            }
        }
    }

    /// Remove an entry from the cache.
    ///
    /// Returns the cached payload if it existed, `None` otherwise.
    pub async fn remove(&self, key: &CacheKey) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        let entry = cache.pop(key)?;
        *current_size = current_size.saturating_sub(entry.payload.len());
        Some(entry.payload)
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Get the current number of cached entries, expired ones included.
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        let cache = self.cache.read().await;
        cache.is_empty()
    }

    /// Get the current total size of cached payloads in bytes.
    pub async fn size(&self) -> usize {
        let current_size = self.current_size.read().await;
        *current_size
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Get the entry time-to-live.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
