//! Content fingerprints for the variant cache.
//!
//! Resizing and re-encoding is the expensive part of a build. Each image's
//! outputs live in a directory whose name ends in a short fingerprint, so a
//! rebuild with unchanged inputs finds the directory and skips all work.
//!
//! ## What goes into the fingerprint
//!
//! - **Source hash**: SHA-256 of the source file bytes. Content-based rather
//!   than mtime-based so it survives `git checkout` and fresh CI clones.
//! - **Dimensions hash**: SHA-256 of the planned variant sizes, rendered as
//!   `"<w>-<h>"` pairs joined by single spaces, in plan order. An undefined
//!   side renders as an empty string (`"800-"`).
//!
//! The two hex digests are concatenated and hashed again. Any change to the
//! image bytes, to a variant size, or to the plan order produces a new
//! fingerprint and therefore a new output directory.
//!
//! The first [`PREFIX_LEN`] hex characters are used as the directory suffix.

use crate::variant::Variant;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;

/// Number of hex characters of the digest used in directory names.
pub const PREFIX_LEN: usize = 7;

/// Hex SHA-256 digest identifying one (source bytes, variant plan) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short cache-bucket suffix used in output directory names.
    pub fn prefix(&self) -> &str {
        &self.0[..PREFIX_LEN]
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn render_dimension(dimension: Option<u32>) -> String {
    dimension.map(|d| d.to_string()).unwrap_or_default()
}

/// SHA-256 hash of the ordered variant sizes.
pub fn hash_dimensions(variants: &[Variant]) -> String {
    let joined = variants
        .iter()
        .map(|v| format!("{}-{}", render_dimension(v.width), render_dimension(v.height)))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{:x}", Sha256::digest(joined.as_bytes()))
}

/// Combine an already-computed source hash with the variant plan.
pub fn combine(source_hash: &str, variants: &[Variant]) -> ContentFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(source_hash.as_bytes());
    hasher.update(hash_dimensions(variants).as_bytes());
    ContentFingerprint(format!("{:x}", hasher.finalize()))
}

/// Fingerprint a source file together with its unique variant plan.
pub fn compute(source: &Path, variants: &[Variant]) -> io::Result<ContentFingerprint> {
    let source_hash = hash_file(source)?;
    let fingerprint = combine(&source_hash, variants);
    tracing::debug!(
        source = %source.display(),
        fingerprint = %fingerprint,
        variants = variants.len(),
        "computed content fingerprint"
    );
    Ok(fingerprint)
}
