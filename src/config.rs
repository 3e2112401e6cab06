//! Configuration management for the resize proxy.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `RESIZE_` prefix
//! - Sensible defaults for all settings
//!
//! # Example
//!
//! ```ignore
//! use image_resize_proxy::config::Config;
//!
//! let config = Config::parse();
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `RESIZE_HOST` - Server bind address (default: 0.0.0.0)
//! - `RESIZE_PORT` - Server port (default: 3000)
//! - `RESIZE_RATE_LIMIT_MAX` - Admissions per window (default: 100)
//! - `RESIZE_RATE_LIMIT_WINDOW` - Window length in seconds (default: 60)
//! - `RESIZE_RATE_LIMIT_PER_CLIENT` - Budget per peer IP instead of global (default: false)
//! - `RESIZE_MAX_WIDTH` - Largest accepted width (default: 2000)
//! - `RESIZE_CACHE_BYTES` - Response cache capacity in bytes (default: 100MB)
//! - `RESIZE_CACHE_TTL` - Response cache expiry in seconds, 0 disables (default: 3600)
//! - `RESIZE_FETCH_TIMEOUT` - Upstream timeout in seconds (default: 10)
//! - `RESIZE_MAX_SOURCE_BYTES` - Largest accepted source image (default: 20MB)
//! - `RESIZE_JPEG_QUALITY` - Output JPEG quality (default: 80)
//! - `RESIZE_MAX_OUTPUT_PIXELS` - Pixel budget per resize (default: 40M)
//! - `RESIZE_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `RESIZE_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::time::Duration;

use clap::Parser;

use crate::io::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_SOURCE_BYTES};
use crate::resize::{
    RateLimitScope, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_OUTPUT_PIXELS, DEFAULT_MAX_WIDTH, DEFAULT_RATE_LIMIT_MAX,
    DEFAULT_RATE_LIMIT_WINDOW,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image Resize Proxy - fetch, resize and cache remote images.
///
/// Serves `GET /?url=<source>&width=<pixels>` and answers with a JPEG of the
/// requested width.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-resize-proxy")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "RESIZE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RESIZE_PORT")]
    pub port: u16,

    // =========================================================================
    // Rate Limiting
    // =========================================================================
    /// Maximum admitted requests per window.
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_MAX, env = "RESIZE_RATE_LIMIT_MAX")]
    pub rate_limit_max: u32,

    /// Rate limit window length in seconds.
    #[arg(
        long,
        default_value_t = DEFAULT_RATE_LIMIT_WINDOW.as_secs(),
        env = "RESIZE_RATE_LIMIT_WINDOW"
    )]
    pub rate_limit_window: u64,

    /// Give each client IP its own budget instead of one shared budget.
    #[arg(long, default_value_t = false, env = "RESIZE_RATE_LIMIT_PER_CLIENT")]
    pub rate_limit_per_client: bool,

    // =========================================================================
    // Resize Configuration
    // =========================================================================
    /// Largest accepted `width` parameter in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_WIDTH, env = "RESIZE_MAX_WIDTH")]
    pub max_width: u32,

    /// JPEG quality for resized output (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "RESIZE_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Largest resize in pixels, counting the resampling buffer.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_OUTPUT_PIXELS,
        env = "RESIZE_MAX_OUTPUT_PIXELS"
    )]
    pub max_output_pixels: u64,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Response cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "RESIZE_CACHE_BYTES")]
    pub cache_bytes: usize,

    /// Response cache entry lifetime in seconds (0 keeps entries until evicted).
    #[arg(
        long,
        default_value_t = DEFAULT_CACHE_TTL.as_secs(),
        env = "RESIZE_CACHE_TTL"
    )]
    pub cache_ttl: u64,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "RESIZE_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // Upstream Configuration
    // =========================================================================
    /// Upstream fetch timeout in seconds.
    #[arg(
        long,
        default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs(),
        env = "RESIZE_FETCH_TIMEOUT"
    )]
    pub fetch_timeout: u64,

    /// Largest accepted source image in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_SOURCE_BYTES, env = "RESIZE_MAX_SOURCE_BYTES")]
    pub max_source_bytes: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "RESIZE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit_max == 0 {
            return Err("rate_limit_max must be greater than 0".to_string());
        }
        if self.rate_limit_window == 0 {
            return Err("rate_limit_window must be greater than 0".to_string());
        }
        if self.max_width == 0 {
            return Err("max_width must be greater than 0".to_string());
        }
        if self.cache_bytes == 0 {
            return Err("cache_bytes must be greater than 0".to_string());
        }
        if self.fetch_timeout == 0 {
            return Err("fetch_timeout must be greater than 0".to_string());
        }
        if self.max_source_bytes == 0 {
            return Err("max_source_bytes must be greater than 0".to_string());
        }
        if self.max_output_pixels == 0 {
            return Err("max_output_pixels must be greater than 0".to_string());
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the rate limit window.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }

    /// Get the rate limit scope.
    pub fn rate_limit_scope(&self) -> RateLimitScope {
        if self.rate_limit_per_client {
            RateLimitScope::PerClient
        } else {
            RateLimitScope::Global
        }
    }

    /// Get the cache entry lifetime, or `None` when expiry is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl > 0).then(|| Duration::from_secs(self.cache_ttl))
    }

    /// Get the upstream fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

// =============================================================================
// Tests
// =============================================================================
