//! Upstream I/O layer.
//!
//! The pipeline only sees the [`ImageFetcher`] trait. [`HttpImageFetcher`]
//! is the production implementation backed by `reqwest`.

mod http_fetcher;
mod image_fetcher;

pub use http_fetcher::{HttpImageFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_SOURCE_BYTES};
pub use image_fetcher::ImageFetcher;
