//! Shared test utilities for the srcset-gen test suite.
//!
//! Provides synthetic image writers and the display-size fixtures that most
//! planner, pipeline, and markup tests share.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("photo.jpg"), 1000, 500);
//! let sizes = breakpoint_sizes();
//! ```

use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::path::Path;

use crate::variant::DisplaySize;

// =========================================================================
// Synthetic images
// =========================================================================

/// Write a small valid JPEG with the given dimensions, creating parent dirs.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write arbitrary bytes as a stand-in source; the mock backend never reads them.
pub fn create_dummy_source(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

// =========================================================================
// Display size fixtures
// =========================================================================

pub fn width_size(width: u32, descriptor: &str) -> DisplaySize {
    DisplaySize {
        width: Some(width),
        height: None,
        size: descriptor.to_string(),
    }
}

pub fn height_size(height: u32, descriptor: &str) -> DisplaySize {
    DisplaySize {
        width: None,
        height: Some(height),
        size: descriptor.to_string(),
    }
}

/// The two-breakpoint layout used throughout the docs:
/// a 400px slot on narrow screens and an 800px slot otherwise.
pub fn breakpoint_sizes() -> Vec<DisplaySize> {
    vec![
        width_size(400, "(max-width: 600px) 400px"),
        width_size(800, "800px"),
    ]
}

// =========================================================================
// Directory inspection
// =========================================================================

/// Sorted file names directly inside `dir`.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
