//! Image Resize Proxy - fetch, resize and cache remote images.
//!
//! This binary starts the HTTP server and configures all components.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_resize_proxy::{
    config::Config,
    io::HttpImageFetcher,
    resize::{JpegResizer, RateLimiter, ResizeService, ResponseCache, DEFAULT_MAX_ENTRIES},
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Image Resize Proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!(
        "  Rate limit: {} requests / {}s ({:?})",
        config.rate_limit_max,
        config.rate_limit_window,
        config.rate_limit_scope()
    );
    info!("  Max width: {}px", config.max_width);
    match config.cache_ttl() {
        Some(ttl) => info!(
            "  Cache: {}MB, ttl {}s",
            config.cache_bytes / (1024 * 1024),
            ttl.as_secs()
        ),
        None => info!("  Cache: {}MB, no ttl", config.cache_bytes / (1024 * 1024)),
    }
    info!(
        "  Upstream: timeout {}s, max {}MB",
        config.fetch_timeout,
        config.max_source_bytes / (1024 * 1024)
    );
    info!("  JPEG quality: {}", config.jpeg_quality);
    info!("  Pixel budget: {}", config.max_output_pixels);

    let fetcher = match HttpImageFetcher::with_limits(config.fetch_timeout(), config.max_source_bytes)
    {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let limiter = RateLimiter::with_limits(config.rate_limit_max, config.rate_limit_window())
        .with_scope(config.rate_limit_scope());
    let cache = ResponseCache::with_config(config.cache_bytes, DEFAULT_MAX_ENTRIES, config.cache_ttl());

    let resizer = JpegResizer::with_quality(config.jpeg_quality)
        .with_max_output_pixels(config.max_output_pixels);

    let resize_service = ResizeService::new(fetcher, resizer)
        .with_cache(cache)
        .with_rate_limiter(limiter)
        .with_max_width(config.max_width);

    let router = create_router(resize_service, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on http://{}", addr);
    info!("  Try: curl 'http://{}/?url=<image-url>&width=320' -o out.jpg", addr);

    if let Err(e) = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_resize_proxy=debug,tower_http=debug"
    } else {
        "image_resize_proxy=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
