//! Source image discovery.
//!
//! When a config lists no `[[images]]`, every file under `source_root` whose
//! extension the imaging backend can both read and write becomes a job.
//! Hidden files and directories (leading `.`) are skipped. When `output_root`
//! sits inside `source_root`, its subtree is pruned so generated variants are
//! never picked up as sources on the next run.
//!
//! Paths are returned relative to the root, `/`-separated, sorted.

use crate::imaging::supported_input_extensions;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| supported_input_extensions().contains(&e.as_str()))
}

fn is_excluded(entry: &DirEntry, excluded: Option<&PathBuf>) -> bool {
    match excluded {
        Some(excluded) if entry.file_type().is_dir() => entry
            .path()
            .canonicalize()
            .is_ok_and(|path| path == *excluded),
        _ => false,
    }
}

/// List supported images under `root` as sorted relative paths.
///
/// `exclude` names a directory (typically the output root) whose subtree is
/// skipped. A directory that does not exist yet excludes nothing.
pub fn discover_images(root: &Path, exclude: Option<&Path>) -> io::Result<Vec<String>> {
    let excluded = exclude.and_then(|dir| dir.canonicalize().ok());
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !is_excluded(e, excluded.as_ref()))
    {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_supported_image(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        found.push(parts.join("/"));
    }
    found.sort();
    tracing::debug!(root = %root.display(), count = found.len(), "discovered images");
    Ok(found)
}
