//! Request parameters and validation.
//!
//! Raw query values arrive as strings. [`RawResizeParams::validate`] turns
//! them into a [`ResizeRequest`] or the [`ResizeError`] the caller should see.

use url::Url;

use crate::error::ResizeError;

/// Default upper bound on the requested width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 2000;

/// Unvalidated `url` and `width` values from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResizeParams {
    /// Source image URL
    pub url: Option<String>,

    /// Target width as sent by the caller
    pub width: Option<String>,
}

impl RawResizeParams {
    /// Create parameters from explicit values.
    pub fn new(url: impl Into<String>, width: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            width: Some(width.into()),
        }
    }

    /// Extract parameters from a raw (still percent-encoded) query string.
    ///
    /// The first occurrence of each key wins and empty values count as absent.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            let slot = match key.as_ref() {
                "url" => &mut params.url,
                "width" => &mut params.width,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        params
    }

    /// Validate into a [`ResizeRequest`].
    ///
    /// Checks run in order: presence of `url`, presence of `width`, width
    /// syntax and range, then URL syntax.
    pub fn validate(&self, max_width: u32) -> Result<ResizeRequest, ResizeError> {
        let url = non_empty(&self.url).ok_or(ResizeError::MissingParameter { name: "url" })?;
        let width =
            non_empty(&self.width).ok_or(ResizeError::MissingParameter { name: "width" })?;

        let target_width = parse_width(width, max_width)?;
        let source_url = parse_source_url(url)?;

        Ok(ResizeRequest {
            source_url,
            target_width,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// A validated resize request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    /// Absolute http(s) URL of the source image
    pub source_url: Url,

    /// Output width in pixels, `1..=max_width`
    pub target_width: u32,
}

/// Parse and range-check a width value.
pub fn parse_width(raw: &str, max_width: u32) -> Result<u32, ResizeError> {
    let value = raw.trim();
    let digits = value.strip_prefix('+').unwrap_or(value);

    match value.parse::<i64>() {
        Ok(width) if width <= 0 => Err(ResizeError::InvalidWidth {
            value: raw.to_string(),
        }),
        Ok(width) if width > max_width as i64 => Err(ResizeError::WidthTooLarge {
            width: value.to_string(),
            max: max_width,
        }),
        // Range-checked against a u32 bound above
        Ok(width) => Ok(width as u32),
        // Digits only but too big for i64: still a width, just far too large
        Err(_) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            Err(ResizeError::WidthTooLarge {
                width: value.to_string(),
                max: max_width,
            })
        }
        Err(_) => Err(ResizeError::InvalidWidth {
            value: raw.to_string(),
        }),
    }
}

/// Parse a source URL, accepting only absolute http(s) URLs with a host.
pub fn parse_source_url(raw: &str) -> Result<Url, ResizeError> {
    let invalid = |reason: &str| ResizeError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    Ok(url)
}
