//! Pure calculation functions for output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the pixel size a variant is actually encoded at.
///
/// The result preserves the source aspect ratio and never exceeds the
/// source's native resolution:
///
/// - only `width` requested → scale to that width
/// - only `height` requested → scale to that height
/// - both → constrained fit inside the `width × height` box
/// - neither → the source size
///
/// Requests larger than the source are capped at a scale of 1.0, so an
/// undersized source is re-encoded at its own size instead of upscaled.
///
/// # Examples
/// ```
/// # use srcset_gen::imaging::calculate_fit_dimensions;
/// // 1000x500 source, 400px wide request → 400x200
/// assert_eq!(calculate_fit_dimensions((1000, 500), Some(400), None), (400, 200));
///
/// // 1600px wide request on the same source is capped → 1000x500
/// assert_eq!(calculate_fit_dimensions((1000, 500), Some(1600), None), (1000, 500));
/// ```
pub fn calculate_fit_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }

    let scale_w = width.map(|w| w as f64 / src_w as f64);
    let scale_h = height.map(|h| h as f64 / src_h as f64);

    let scale = match (scale_w, scale_h) {
        (Some(sw), Some(sh)) => sw.min(sh),
        (Some(sw), None) => sw,
        (None, Some(sh)) => sh,
        (None, None) => 1.0,
    }
    .min(1.0);

    let out_w = ((src_w as f64 * scale).round() as u32).max(1);
    let out_h = ((src_h as f64 * scale).round() as u32).max(1);
    (out_w, out_h)
}

/// Whether a requested size exceeds the source in any requested dimension.
pub fn exceeds_source(source: (u32, u32), width: Option<u32>, height: Option<u32>) -> bool {
    width.is_some_and(|w| w > source.0) || height.is_some_and(|h| h > source.1)
}
