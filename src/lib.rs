//! # srcset-gen
//!
//! Responsive image variants and `srcset` markup for static sites.
//!
//! Given a source image, a list of display sizes (one per layout breakpoint)
//! and a list of pixel densities, srcset-gen writes one resized raster per
//! distinct pixel size and renders an `<img>` tag whose `srcset` and `sizes`
//! let the browser pick the right file.
//!
//! # Pipeline
//!
//! ```text
//! 1. Plan         sizes × densities  →  unique variants   (pure)
//! 2. Fingerprint  source bytes + plan →  <image>-<hash7>/  (one file read)
//! 3. Generate     decode once, resize per variant, unless the directory exists
//! 4. Markup       variants → <img src srcset sizes …/>
//! ```
//!
//! The fingerprinted directory doubles as the cache: if it exists, the
//! variants inside it are current and nothing is decoded or encoded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`variant`] | Display sizes, the variant planner, fallback selection |
//! | [`fingerprint`] | SHA-256 content fingerprints and their directory prefix |
//! | [`pipeline`] | Per-image jobs: prepare, cache check, staged generation, events |
//! | [`markup`] | `<img>` tag rendering with escaped `src`/`srcset`/`sizes` |
//! | [`imaging`] | Backend trait and the pure-Rust resizer |
//! | [`config`] | `srcset.toml` loading, defaults merging, validation, job resolution |
//! | [`discover`] | Walks `source_root` for images when none are listed |
//! | [`output`] | CLI output formatting |

pub mod config;
pub mod discover;
pub mod fingerprint;
pub mod imaging;
pub mod markup;
pub mod output;
pub mod pipeline;
pub mod variant;

#[cfg(test)]
pub(crate) mod test_helpers;
