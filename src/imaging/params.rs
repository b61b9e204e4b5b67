//! Parameter types for raster operations.
//!
//! These structs describe *what* to produce, not *how*. They sit between the
//! [`pipeline`](crate::pipeline) (which decides which variants exist) and the
//! [`backend`](super::backend) (which does the pixel work), so a mock backend
//! can stand in during tests without touching orchestration logic.
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ResizeParams`]: one resize: destination path plus optional target width/height.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for a single variant resize.
///
/// A missing dimension means "follow the source aspect ratio". When both are
/// present the result fits inside the box; it is never stretched.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub output: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Quality,
}
