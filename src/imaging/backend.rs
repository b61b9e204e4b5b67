//! Raster resizer trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between variant orchestration and
//! pixel work. It defines three operations: identify, decode, and resize.
//! Decoding is separate from resizing so the pipeline can decode a source once
//! and share the pixels read-only across every variant.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image` crate.

use super::params::ResizeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for raster resizer backends.
///
/// Implementations must preserve aspect ratio, must never upscale beyond the
/// decoded source, and must infer the encoded format from the output path's
/// extension.
pub trait ImageBackend: Sync {
    /// Read image dimensions without a full decode where possible.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the whole source image.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Scale an already-decoded image and write it to `params.output`.
    fn resize(&self, source: &DynamicImage, params: &ResizeParams) -> Result<(), BackendError>;
}
