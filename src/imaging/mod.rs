//! Raster resizing in pure Rust, with zero system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Decode** | `image::ImageReader` |
//! | **Resize → source format** | Lanczos3, constrained fit, never upscaled |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a resize
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_fit_dimensions, exceeds_source};
pub use params::{Quality, ResizeParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
