//! Variant planning: which raster sizes to produce for one source image.
//!
//! A page declares its layout as an ordered list of [`DisplaySize`]s (one per
//! breakpoint) and a set of pixel-density multipliers. Every
//! (display size, density) pair asks for one raster, but many pairs collapse
//! to the same pixel size: a 2× request for a 400px slot is the same file as
//! a 1× request for an 800px slot. [`plan`] expands the cross product and
//! keeps only the first request for each distinct `(width, height)`.
//!
//! ## Ordering
//!
//! Densities are visited largest first, display sizes in declaration order:
//!
//! ```text
//! sizes = [400w, 800w], densities = [1, 2]
//!
//!   400w × 2 →  800    kept
//!   400w × 1 →  400    kept
//!   800w × 2 → 1600    kept
//!   800w × 1 →  800    duplicate of the first
//!
//! plan = [800, 400, 1600]
//! ```
//!
//! The order is stable for identical input, which keeps emitted markup and
//! the content fingerprint reproducible.

use crate::imaging::exceeds_source;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("no pixel densities given")]
    EmptyDensities,
    #[error("pixel density must be a positive number, got {0}")]
    NonPositiveDensity(f64),
    #[error("no display sizes given")]
    EmptyDisplaySizes,
    #[error("display size #{index} (\"{size}\") has neither width nor height")]
    MissingDimensions { index: usize, size: String },
    #[error("display size #{index} (\"{size}\") has a zero width or height")]
    ZeroDimension { index: usize, size: String },
}

/// One breakpoint: the slot an image fills at display time.
///
/// `size` is emitted verbatim into the `sizes` attribute, e.g.
/// `"(max-width: 600px) 400px"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplaySize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub size: String,
}

/// One concrete output raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Source file extension including the dot, e.g. `".jpg"`.
    pub extension: String,
    /// The request is larger than the source in a defined dimension.
    pub undersized: bool,
}

impl Variant {
    /// `<width>x<height><extension>`; an undefined side is left empty
    /// (`"800x.jpg"`), so equal dimensions always mean equal filenames and
    /// distinct dimensions never do.
    pub fn filename(&self) -> String {
        format!(
            "{}x{}{}",
            self.width.map(|w| w.to_string()).unwrap_or_default(),
            self.height.map(|h| h.to_string()).unwrap_or_default(),
            self.extension
        )
    }

    pub fn dimensions(&self) -> (Option<u32>, Option<u32>) {
        (self.width, self.height)
    }
}

/// Scaled pixel size, never below one pixel.
fn scale(dimension: Option<u32>, density: f64) -> Option<u32> {
    dimension.map(|d| ((d as f64 * density).round() as u32).max(1))
}

/// Sort densities largest first, rejecting empty or non-positive input.
pub fn ordered_densities(densities: &[f64]) -> Result<Vec<f64>, PlanError> {
    if densities.is_empty() {
        return Err(PlanError::EmptyDensities);
    }
    if let Some(&bad) = densities.iter().find(|d| !(d.is_finite() && **d > 0.0)) {
        return Err(PlanError::NonPositiveDensity(bad));
    }
    let mut sorted = densities.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    Ok(sorted)
}

/// Check a display-size list on its own (used by config validation too).
pub fn validate_display_sizes(sizes: &[DisplaySize]) -> Result<(), PlanError> {
    if sizes.is_empty() {
        return Err(PlanError::EmptyDisplaySizes);
    }
    if let Some((index, ds)) = sizes
        .iter()
        .enumerate()
        .find(|(_, ds)| ds.width.is_none() && ds.height.is_none())
    {
        return Err(PlanError::MissingDimensions {
            index,
            size: ds.size.clone(),
        });
    }
    if let Some((index, ds)) = sizes
        .iter()
        .enumerate()
        .find(|(_, ds)| ds.width == Some(0) || ds.height == Some(0))
    {
        return Err(PlanError::ZeroDimension {
            index,
            size: ds.size.clone(),
        });
    }
    Ok(())
}

/// Expand display sizes × densities into the ordered, deduplicated variant list.
///
/// `source` is the native `(width, height)` of the image; it only drives the
/// `undersized` flag. Pure function.
pub fn plan(
    display_sizes: &[DisplaySize],
    densities: &[f64],
    source: (u32, u32),
    extension: &str,
) -> Result<Vec<Variant>, PlanError> {
    validate_display_sizes(display_sizes)?;
    let densities = ordered_densities(densities)?;

    let mut seen = HashSet::new();
    let mut variants = Vec::new();

    for display in display_sizes {
        for &density in &densities {
            let width = scale(display.width, density);
            let height = scale(display.height, density);
            if !seen.insert((width, height)) {
                continue;
            }
            variants.push(Variant {
                width,
                height,
                extension: extension.to_string(),
                undersized: exceeds_source(source, width, height),
            });
        }
    }

    Ok(variants)
}

/// The variant used as the plain `src` fallback: the largest declared width
/// (or height when no variant has a width), first one wins on ties.
pub fn fallback(variants: &[Variant]) -> Option<&Variant> {
    let key: fn(&Variant) -> Option<u32> = if variants.iter().any(|v| v.width.is_some()) {
        |v| v.width
    } else {
        |v| v.height
    };
    variants
        .iter()
        .fold(None, |best: Option<&Variant>, candidate| match best {
            Some(b) if key(candidate) <= key(b) => Some(b),
            _ => Some(candidate),
        })
}

/// Whether any planned variant asks for more pixels than the source has.
pub fn any_undersized(variants: &[Variant]) -> bool {
    variants.iter().any(|v| v.undersized)
}
