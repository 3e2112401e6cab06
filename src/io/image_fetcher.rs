use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::FetchError;

/// Trait for retrieving the raw bytes of a source image.
///
/// Implementations make a single attempt per call. Any failure (DNS,
/// refused connection, timeout, non-success status) is reported as a
/// [`FetchError`]; retrying is left to the caller.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the full body at `url`.
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl<F: ImageFetcher + ?Sized> ImageFetcher for Arc<F> {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        (**self).fetch(url).await
    }
}
