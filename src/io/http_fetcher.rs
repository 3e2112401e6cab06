use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::ImageFetcher;
use crate::error::FetchError;

/// Default upper bound on a single upstream request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum size of a source image body: 20MB
pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 20 * 1024 * 1024;

/// `reqwest`-backed implementation of [`ImageFetcher`].
///
/// Issues one GET per fetch. The whole request, body included, is bounded
/// by the configured timeout, and the body is streamed so that oversized
/// sources are abandoned as soon as they cross `max_bytes`.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpImageFetcher {
    /// Create a fetcher with the default timeout and body limit.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_limits(DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_SOURCE_BYTES)
    }

    /// Create a fetcher with a custom timeout and body limit.
    pub fn with_limits(timeout: Duration, max_bytes: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the maximum accepted body size in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn map_error(&self, url: &Url, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Reject early when the server announces an oversized body
        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_error(url, e))? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, bytes = body.len(), "Fetched source image");

        Ok(body.freeze())
    }
}
