//! Image transformer.
//!
//! This module handles decoding fetched source images and re-encoding them
//! as JPEG at a requested width.
//!
//! # Design Decisions
//!
//! - **Fixed output format**: every result is JPEG regardless of the input
//!   format. Alpha channels are dropped when flattening to RGB.
//!
//! - **Width-driven**: the caller picks the width; height follows the source
//!   aspect ratio and never drops below one pixel. Upscaling is allowed.
//!
//! - **Bounded output**: a tall, narrow source scaled to a wide target can ask
//!   for billions of pixels. Targets over the pixel budget are rejected before
//!   any resampling buffer is allocated.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::error::TransformError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Default pixel budget for a resize (40 megapixels, e.g. 2000x20000).
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 40_000_000;

/// Trait for resizing raw image bytes.
///
/// Implementations are CPU-bound and synchronous; the pipeline runs them on
/// the blocking thread pool.
pub trait ImageTransformer: Send + Sync + 'static {
    /// Decode `source`, resize it to `width` pixels wide, and encode the result.
    fn resize(&self, source: &[u8], width: u32) -> Result<Bytes, TransformError>;
}

// =============================================================================
// JPEG Resizer
// =============================================================================

/// [`ImageTransformer`] backed by the `image` crate, producing JPEG output.
///
/// # Example
///
/// ```ignore
/// use image_resize_proxy::resize::{ImageTransformer, JpegResizer};
///
/// let resizer = JpegResizer::new();
/// let thumbnail = resizer.resize(&png_bytes, 320)?;
/// ```
#[derive(Debug, Clone)]
pub struct JpegResizer {
    quality: u8,
    filter: FilterType,
    max_output_pixels: u64,
}

impl JpegResizer {
    /// Create a resizer with default quality and the Lanczos3 filter.
    pub fn new() -> Self {
        Self::with_quality(DEFAULT_JPEG_QUALITY)
    }

    /// Create a resizer with a specific JPEG quality (clamped to 1-100).
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
            filter: FilterType::Lanczos3,
            max_output_pixels: DEFAULT_MAX_OUTPUT_PIXELS,
        }
    }

    /// Set the pixel budget.
    ///
    /// Bounds both the output image and the intermediate buffer, which is
    /// as wide as the source and as tall as the output.
    pub fn with_max_output_pixels(mut self, max_output_pixels: u64) -> Self {
        self.max_output_pixels = max_output_pixels;
        self
    }

    /// Get the pixel budget.
    pub fn max_output_pixels(&self) -> u64 {
        self.max_output_pixels
    }

    fn check_budget(
        &self,
        source_width: u32,
        width: u32,
        height: u32,
    ) -> Result<(), TransformError> {
        let pixels = u64::from(width.max(source_width)) * u64::from(height);
        if pixels > self.max_output_pixels {
            return Err(TransformError::TooLarge {
                width,
                height,
                max_pixels: self.max_output_pixels,
            });
        }
        Ok(())
    }

    /// Use a different resampling filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Get the output JPEG quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Get image dimensions without fully decoding.
    ///
    /// # Returns
    ///
    /// `(width, height)` in pixels.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), TransformError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode {
                message: e.to_string(),
            })?;

        reader
            .into_dimensions()
            .map_err(|e| TransformError::Decode {
                message: e.to_string(),
            })
    }

    fn decode(&self, source: &[u8]) -> Result<DynamicImage, TransformError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode {
                message: e.to_string(),
            })?;

        if reader.format().is_none() {
            return Err(TransformError::Decode {
                message: "unrecognized image format".to_string(),
            });
        }

        reader.decode().map_err(|e| TransformError::Decode {
            message: e.to_string(),
        })
    }
}

impl Default for JpegResizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageTransformer for JpegResizer {
    fn resize(&self, source: &[u8], width: u32) -> Result<Bytes, TransformError> {
        let img = self.decode(source)?;

        let height = scaled_height(img.width(), img.height(), width);
        self.check_budget(img.width(), width, height)?;

        let resized = img.resize_exact(width, height, self.filter);

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| TransformError::Encode {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Height that keeps the source aspect ratio at `target_width`.
///
/// Rounds to the nearest pixel and never returns less than 1.
pub fn scaled_height(source_width: u32, source_height: u32, target_width: u32) -> u32 {
    if source_width == 0 {
        return 1;
    }
    let height = (source_height as u64 * target_width as u64 + source_width as u64 / 2)
        / source_width as u64;
    height.clamp(1, u32::MAX as u64) as u32
}

/// Clamp quality to valid range.
///
/// Values below 1 become 1, values above 100 become 100.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
