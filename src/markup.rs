//! `<img>` markup for a generated variant set.
//!
//! The tag carries three derived attributes plus whatever the caller passes
//! through:
//!
//! ```text
//! <img src="/img/dawn.jpg-1a2b3c4/1600x.jpg"
//!      srcset="/img/dawn.jpg-1a2b3c4/800x.jpg 800w, …, /img/dawn.jpg-1a2b3c4/1600x.jpg 1600w"
//!      sizes="(max-width: 600px) 400px, 800px"
//!      alt="Dawn"/>
//! ```
//!
//! - `src` is the [`fallback`] variant.
//! - `srcset` lists every variant with a defined width, in plan order.
//!   Height-only variants are still generated but cannot be described with a
//!   `w` descriptor, so they are left out.
//! - `sizes` lists the display-size descriptors in declaration order.
//!
//! The three values are HTML-escaped through maud's renderer; the extra
//! attribute string is inserted as-is.

use crate::variant::{DisplaySize, Variant, fallback};
use maud::html;

/// Escape a string for use inside a double-quoted attribute value.
pub fn escape_attribute(value: &str) -> String {
    html! { (value) }.into_string()
}

/// Public URL of one variant file.
pub fn variant_url(web_output_dir: &str, variant: &Variant) -> String {
    format!(
        "{}/{}",
        web_output_dir.trim_end_matches('/'),
        variant.filename()
    )
}

/// Unescaped `srcset` value.
pub fn srcset_value(variants: &[Variant], web_output_dir: &str) -> String {
    variants
        .iter()
        .filter_map(|v| {
            v.width
                .map(|w| format!("{} {}w", variant_url(web_output_dir, v), w))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unescaped `sizes` value.
pub fn sizes_value(display_sizes: &[DisplaySize]) -> String {
    display_sizes
        .iter()
        .map(|ds| ds.size.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the newline-terminated, self-closing `<img>` tag.
pub fn render_img_tag(
    variants: &[Variant],
    display_sizes: &[DisplaySize],
    web_output_dir: &str,
    attributes: &str,
) -> String {
    let src = fallback(variants)
        .map(|v| variant_url(web_output_dir, v))
        .unwrap_or_default();
    let attributes = attributes.trim();
    let extra = if attributes.is_empty() {
        String::new()
    } else {
        format!("{attributes} ")
    };
    format!(
        "<img src=\"{}\" srcset=\"{}\" sizes=\"{}\" {}/>\n",
        escape_attribute(&src),
        escape_attribute(&srcset_value(variants, web_output_dir)),
        escape_attribute(&sizes_value(display_sizes)),
        extra
    )
}
