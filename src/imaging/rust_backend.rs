//! Pure Rust raster backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::ImageReader` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3`, size from [`calculate_fit_dimensions`] |
//! | Encode | format inferred from the output extension; JPEG honours [`Quality`](super::Quality) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{Quality, ResizeParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::BufWriter;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose codecs are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled() && fmt.writing_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the image file extensions that can be both decoded and re-encoded.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
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

fn output_format(path: &Path) -> Result<ImageFormat, BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    PHOTO_CANDIDATES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, fmt)| *fmt)
        .ok_or_else(|| BackendError::Encode(format!("Unsupported output format: {ext}")))
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let format = output_format(path)?;
    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality.value() as u8);
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(|e| BackendError::Encode(format!("{}: {}", path.display(), e)))
        }
        other => img
            .save_with_format(path, other)
            .map_err(|e| BackendError::Encode(format!("{}: {}", path.display(), e))),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::Decode(format!("Failed to read dimensions of {}: {}", path.display(), e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e)))
    }

    fn resize(&self, source: &DynamicImage, params: &ResizeParams) -> Result<(), BackendError> {
        let (width, height) = calculate_fit_dimensions(
            (source.width(), source.height()),
            params.width,
            params.height,
        );
        let resized = if (width, height) == (source.width(), source.height()) {
            source.clone()
        } else {
            source.resize_exact(width, height, FilterType::Lanczos3)
        };
        save_image(&resized, &params.output, params.quality)
    }
}
