//! Build configuration.
//!
//! Handles loading, validating, and resolving `srcset.toml`. User values are
//! merged on top of the stock defaults, so a config file only needs the keys
//! it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_root = "images"        # Where source images live
//! output_root = "_site/srcset"  # Where variant directories are written
//! web_root = "/srcset"          # URL prefix output_root is served under
//! densities = [1, 2]            # Pixel-density multipliers (or "1,2")
//! quality = 90                  # JPEG quality (1-100)
//!
//! [[sizes]]                     # Default layout, one entry per breakpoint
//! width = 400
//! size = "(max-width: 600px) 400px"
//!
//! [[sizes]]
//! width = 800
//! size = "800px"
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//!
//! [[images]]                    # Omit entirely to process every image under source_root
//! path = "photos/dawn.jpg"
//! attributes = 'alt="Dawn" class="hero"'
//! densities = "1,2,3"           # Optional per-image override
//! ```
//!
//! ## Densities
//!
//! `densities` accepts either a TOML array of numbers (`[1, 1.5, 2]`) or a
//! comma-separated string of integers (`"1,2"`), the form template tags tend
//! to pass through. Both normalise to a plain list of numbers before any
//! planning happens.
//!
//! Unknown keys are rejected to catch typos early.

use crate::discover::discover_images;
use crate::imaging::Quality;
use crate::pipeline::ImageJob;
use crate::variant::{self, DisplaySize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "srcset.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pixel densities as written in the config: a list or a delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Densities {
    List(Vec<f64>),
    Delimited(String),
}

impl Densities {
    /// Normalise to a list of numbers. Each delimited entry must be an integer.
    pub fn to_vec(&self) -> Result<Vec<f64>, ConfigError> {
        let values = match self {
            Densities::List(values) => values.clone(),
            Densities::Delimited(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<u32>().map(f64::from).map_err(|_| {
                        ConfigError::Validation(format!(
                            "densities: \"{part}\" is not a whole number"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        variant::ordered_densities(&values)
            .map_err(|e| ConfigError::Validation(format!("densities: {e}")))?;
        Ok(values)
    }
}

impl Default for Densities {
    fn default() -> Self {
        Densities::List(vec![1.0, 2.0])
    }
}

/// Top-level configuration loaded from `srcset.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SrcsetConfig {
    /// Directory image paths are relative to.
    pub source_root: String,
    /// Filesystem directory variant directories are written under.
    pub output_root: String,
    /// URL prefix under which `output_root` is served.
    pub web_root: String,
    /// Default pixel-density multipliers.
    pub densities: Densities,
    /// Lossy encoding quality (1-100).
    pub quality: u32,
    /// Default display sizes, in breakpoint order.
    pub sizes: Vec<DisplaySize>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Explicit image list. Empty means "discover under `source_root`".
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageEntry>,
}

impl Default for SrcsetConfig {
    fn default() -> Self {
        Self {
            source_root: "images".to_string(),
            output_root: "_site/srcset".to_string(),
            web_root: "/srcset".to_string(),
            densities: Densities::default(),
            quality: 90,
            sizes: vec![
                DisplaySize {
                    width: Some(400),
                    height: None,
                    size: "(max-width: 600px) 400px".to_string(),
                },
                DisplaySize {
                    width: Some(800),
                    height: None,
                    size: "800px".to_string(),
                },
            ],
            processing: ProcessingConfig::default(),
            images: Vec::new(),
        }
    }
}

/// One image to process, with optional overrides of the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageEntry {
    /// Path relative to `source_root`.
    pub path: String,
    /// Extra `<img>` attributes, inserted verbatim.
    #[serde(default)]
    pub attributes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub densities: Option<Densities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<DisplaySize>>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

fn validate_layout(
    context: &str,
    sizes: &[DisplaySize],
    densities: &Densities,
) -> Result<(), ConfigError> {
    variant::validate_display_sizes(sizes)
        .map_err(|e| ConfigError::Validation(format!("{context}sizes: {e}")))?;
    densities.to_vec().map_err(|e| match e {
        ConfigError::Validation(msg) => ConfigError::Validation(format!("{context}{msg}")),
        other => other,
    })?;
    Ok(())
}

impl SrcsetConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        validate_layout("", &self.sizes, &self.densities)?;
        for (i, entry) in self.images.iter().enumerate() {
            if entry.path.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "images[{i}].path must not be empty"
                )));
            }
            let context = format!("images[{i}] ({}): ", entry.path);
            validate_layout(
                &context,
                entry.sizes.as_deref().unwrap_or(&self.sizes),
                entry.densities.as_ref().unwrap_or(&self.densities),
            )?;
        }
        Ok(())
    }

    /// Build one job per image entry, resolving per-image overrides.
    ///
    /// Relative roots are resolved against `base_dir` (the config file's
    /// directory). With no `[[images]]`, every supported image under
    /// `source_root` becomes a job with the default layout; `output_root` is
    /// skipped when it lies inside `source_root`.
    pub fn jobs(&self, base_dir: &Path) -> Result<Vec<ImageJob>, ConfigError> {
        let source_root = base_dir.join(&self.source_root);
        let output_root = base_dir.join(&self.output_root);

        let entries: Vec<ImageEntry> = if self.images.is_empty() {
            discover_images(&source_root, Some(output_root.as_path()))?
                .into_iter()
                .map(|path| ImageEntry {
                    path,
                    ..ImageEntry::default()
                })
                .collect()
        } else {
            self.images.clone()
        };

        entries
            .into_iter()
            .map(|entry| {
                let densities = entry.densities.as_ref().unwrap_or(&self.densities).to_vec()?;
                Ok(ImageJob {
                    source_root: source_root.clone(),
                    image_path: entry.path.trim_start_matches('/').to_string(),
                    output_root: output_root.clone(),
                    web_root: self.web_root.clone(),
                    display_sizes: entry.sizes.unwrap_or_else(|| self.sizes.clone()),
                    densities,
                    attributes: entry.attributes,
                    quality: Quality::new(self.quality),
                })
            })
            .collect()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SrcsetConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely (arrays included,
///   so a user `[[sizes]]` list replaces the stock layout instead of extending it).
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SrcsetConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SrcsetConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file.
///
/// A missing file yields the validated stock defaults; a present file is
/// merged on top of them.
pub fn load_config(path: &Path) -> Result<SrcsetConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `srcset.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# srcset-gen Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory that image paths are relative to.
source_root = "images"

# Directory the generated variant directories are written under.
# Each image gets <output_root>/<image path>-<fingerprint>/.
output_root = "_site/srcset"

# URL prefix under which output_root is served.
web_root = "/srcset"

# Pixel-density multipliers. Either a list of numbers or a comma-separated
# string of whole numbers, e.g. "1,2".
densities = [1.0, 2.0]

# JPEG encoding quality (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Display sizes
# ---------------------------------------------------------------------------
# One entry per breakpoint, in the order they should appear in `sizes`.
# Each needs a width and/or height (CSS pixels at 1x) and the size string
# emitted verbatim into the sizes attribute.
[[sizes]]
width = 400
size = "(max-width: 600px) 400px"

[[sizes]]
width = 800
size = "800px"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
# Without any [[images]] entries every supported image under source_root is
# processed with the defaults above. Entries may override densities/sizes.
#
# [[images]]
# path = "photos/dawn.jpg"
# attributes = 'alt="Dawn" class="hero"'
# densities = "1,2,3"
"##
}
