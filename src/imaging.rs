//! Image resize/encode backend.
//!
//! The [`ImageBackend`] trait is the seam between the Markdown image
//! pipeline (which decides *what* variants an entry needs) and the pixel
//! work (decode, resample, encode). The production implementation is
//! [`RustBackend`] — pure Rust via the `image` crate, statically linked.
//! Tests swap in a recording mock.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize` with the configured filter |
//! | Encode → PNG | `image` PNG encoder (lossless) |
//! | Encode → everything else | `image::codecs::jpeg::JpegEncoder` at the configured quality |

use crate::config::ResizeFilter;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode failed: {0}")]
    Decode(String),
    #[error("Image encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// One resize+encode request: a source raster and its two derived variants.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantParams {
    pub source: PathBuf,
    pub dest_full: PathBuf,
    pub dest_thumb: PathBuf,
    /// Max width of the full variant. Zero disables downscaling.
    pub full_max_width: u32,
    pub thumb_width: u32,
    pub filter: ResizeFilter,
    /// Lossy encode quality, 0..1.
    pub quality: f32,
}

/// Trait for image processing backends.
///
/// A single operation covers the pipeline's whole need: decode the source
/// once, write the full and thumb variants. Output format follows each
/// target's file extension.
pub trait ImageBackend {
    fn generate_variants(&self, params: &VariantParams) -> Result<(), BackendError>;
}

/// Pure Rust backend using the `image` crate.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn generate_variants(&self, params: &VariantParams) -> Result<(), BackendError> {
        let original = image::open(&params.source).map_err(|e| {
            BackendError::Decode(format!("{}: {}", params.source.display(), e))
        })?;
        let filter = params.filter.to_filter_type();
        let full = resize_to_width(&original, params.full_max_width, filter);
        let thumb = resize_to_width(&original, params.thumb_width, filter);
        write_variant(&full, &params.dest_full, params.quality)?;
        write_variant(&thumb, &params.dest_thumb, params.quality)?;
        Ok(())
    }
}

/// Downscale to `target` width preserving aspect ratio. Never upscales;
/// a zero target returns the image unchanged.
fn resize_to_width(image: &DynamicImage, target: u32, filter: FilterType) -> DynamicImage {
    if target == 0 || image.width() <= target {
        return image.clone();
    }
    image.resize(target, u32::MAX, filter)
}

/// Encode by target extension: PNG stays lossless, everything else goes
/// through the JPEG encoder at the requested quality.
fn write_variant(image: &DynamicImage, dest: &Path, quality: f32) -> Result<(), BackendError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let lossless = dest
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if lossless {
        image
            .save_with_format(dest, ImageFormat::Png)
            .map_err(|e| BackendError::Encode(format!("{}: {}", dest.display(), e)))
    } else {
        let clamped = quality.clamp(0.0, 1.0);
        let file = File::create(dest)?;
        let mut writer = BufWriter::new(file);
        let encoder =
            JpegEncoder::new_with_quality(&mut writer, ((clamped * 100.0).round() as u8).max(1));
        // JPEG has no alpha channel.
        image
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::Encode(format!("{}: {}", dest.display(), e)))
    }
}
