//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Build
//!
//! Progress lines are streamed while jobs run, then each image's tag is
//! printed in job order, followed by the cache summary:
//!
//! ```text
//! Generated _site/srcset/dawn.jpg-1a2b3c4/800x.jpg
//! Warning: dawn.jpg is smaller than the requested output file. It will be resized without upscaling.
//! Cached dusk.jpg → _site/srcset/dusk.jpg-9f8e7d6
//!
//! dawn.jpg
//! <img src="…" srcset="…" sizes="…" alt="Dawn" />
//!
//! Cache: 1 cached, 1 generated (2 total)
//! ```
//!
//! ## Plan
//!
//! ```text
//! dawn.jpg (1000x500) → _site/srcset/dawn.jpg-1a2b3c4 [missing]
//!     800x.jpg
//!     400x.jpg
//!     1600x.jpg (undersized)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::pipeline::{CacheStats, GeneratedImage, PipelineError, PipelineEvent, PreparedImage};
use crate::variant::Variant;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Build
// ============================================================================

/// Format a single progress event.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::VariantGenerated { path, .. } => {
            vec![format!("Generated {}", path.display())]
        }
        PipelineEvent::UpscaleAdvisory { image_path } => vec![format!(
            "Warning: {image_path} is smaller than the requested output file. \
             It will be resized without upscaling."
        )],
        PipelineEvent::CacheHit {
            image_path,
            output_dir,
        } => vec![format!("Cached {image_path} → {}", output_dir.display())],
    }
}

/// Format per-image results: tags for successes, errors for failures.
pub fn format_build_output(results: &[Result<GeneratedImage, PipelineError>]) -> Vec<String> {
    let mut lines = Vec::new();
    for result in results {
        lines.push(String::new());
        match result {
            Ok(image) => {
                lines.push(image.image_path.clone());
                lines.push(image.tag.trim_end().to_string());
            }
            Err(e) => lines.push(format!("Error: {e}")),
        }
    }
    lines
}

pub fn format_build_summary(stats: &CacheStats) -> String {
    format!("Cache: {stats}")
}

pub fn print_build_output(results: &[Result<GeneratedImage, PipelineError>], stats: &CacheStats) {
    for line in format_build_output(results) {
        println!("{}", line);
    }
    println!();
    println!("{}", format_build_summary(stats));
}

// ============================================================================
// Plan
// ============================================================================

fn variant_line(variant: &Variant) -> String {
    if variant.undersized {
        format!("{}{} (undersized)", indent(1), variant.filename())
    } else {
        format!("{}{}", indent(1), variant.filename())
    }
}

/// Format the variant plan of one prepared image.
pub fn format_plan(prepared: &PreparedImage) -> Vec<String> {
    let (w, h) = prepared.source_dimensions;
    let state = if prepared.location.exists() {
        "cached"
    } else {
        "missing"
    };
    let mut lines = vec![format!(
        "{} ({}x{}) → {} [{}]",
        prepared.image_path,
        w,
        h,
        prepared.location.output_dir.display(),
        state
    )];
    lines.extend(prepared.variants.iter().map(variant_line));
    lines
}

pub fn print_plan(prepared: &PreparedImage) {
    for line in format_plan(prepared) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// One line per job: `ok <path>` or `error <path>: <reason>`.
pub fn format_check<'a>(
    results: impl IntoIterator<Item = (&'a str, Result<(), String>)>,
) -> Vec<String> {
    results
        .into_iter()
        .map(|(path, result)| match result {
            Ok(()) => format!("ok {path}"),
            Err(reason) => format!("error {path}: {reason}"),
        })
        .collect()
}
