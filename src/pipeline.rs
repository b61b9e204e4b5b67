//! Per-image variant generation.
//!
//! One [`ImageJob`] is one source image with its layout. Processing a job:
//!
//! ```text
//! 1. validate   display sizes + densities           (no I/O)
//! 2. identify   source dimensions                   (header read)
//! 3. plan       unique variants                     (variant::plan)
//! 4. fingerprint source bytes + variant sizes       (fingerprint::compute)
//! 5. locate     <output_root>/<image_path>-<fp7>/
//! 6. generate   skipped entirely if that directory exists
//! 7. render     <img> tag                           (markup::render_img_tag)
//! ```
//!
//! ## Cache population
//!
//! The output directory's existence is the only cache signal, so it must
//! never exist half-written. Variants are encoded into a hidden sibling
//! staging directory and the staging directory is renamed into place once
//! every resize succeeded. A failed job removes its staging directory. If
//! another job wins the rename, the loser discards its copy and reports a
//! cache hit.
//!
//! ## Parallelism
//!
//! Jobs share no state and run in parallel with [rayon](https://docs.rs/rayon)
//! ([`process_all`]). Inside a job the source is decoded once and the variant
//! resizes run in parallel against the shared read-only pixels; each writes
//! its own filename, which the planner guarantees is unique.
//!
//! ## Events
//!
//! Progress is reported as [`PipelineEvent`]s over an optional channel
//! instead of printing, so callers decide how to display it and tests can
//! assert on it.

use crate::fingerprint::{self, ContentFingerprint};
use crate::imaging::{BackendError, ImageBackend, Quality, ResizeParams};
use crate::markup::render_img_tag;
use crate::variant::{self, DisplaySize, PlanError, Variant};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration for {image}: {source}")]
    InvalidConfiguration {
        image: String,
        #[source]
        source: PlanError,
    },
    #[error("Source image unreadable: {}: {reason}", .path.display())]
    SourceUnreadable { path: PathBuf, reason: String },
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to produce the variants and markup for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    /// Directory the image path is relative to.
    pub source_root: PathBuf,
    /// Image path relative to `source_root`, e.g. `"photos/dawn.jpg"`.
    pub image_path: String,
    /// Filesystem root for generated directories.
    pub output_root: PathBuf,
    /// Public URL root that `output_root` is served under.
    pub web_root: String,
    pub display_sizes: Vec<DisplaySize>,
    pub densities: Vec<f64>,
    /// Extra attributes spliced verbatim into the `<img>` tag.
    pub attributes: String,
    pub quality: Quality,
}

impl ImageJob {
    pub fn source_path(&self) -> PathBuf {
        self.source_root.join(&self.image_path)
    }

    /// Source extension including the dot, or empty when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.image_path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }
}

/// Where one fingerprinted variant set lives, on disk and on the web.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLocation {
    pub output_dir: PathBuf,
    pub web_output_dir: String,
}

impl OutputLocation {
    pub fn new(
        output_root: &Path,
        web_root: &str,
        image_path: &str,
        fingerprint: &ContentFingerprint,
    ) -> Self {
        let dir_name = format!("{}-{}", image_path, fingerprint.prefix());
        Self {
            output_dir: output_root.join(&dir_name),
            web_output_dir: format!("{}/{}", web_root.trim_end_matches('/'), dir_name),
        }
    }

    /// Whether a previous run already produced this variant set.
    pub fn exists(&self) -> bool {
        self.output_dir.is_dir()
    }
}

/// A planned, fingerprinted job that has not touched the output tree yet.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub source_path: PathBuf,
    pub image_path: String,
    pub source_dimensions: (u32, u32),
    pub variants: Vec<Variant>,
    pub fingerprint: ContentFingerprint,
    pub location: OutputLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// The fingerprinted directory already existed; nothing was written.
    Cached,
    /// Every variant was encoded by this run.
    Generated,
}

/// Progress reported while processing jobs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    CacheHit {
        image_path: String,
        output_dir: PathBuf,
    },
    /// At least one variant asks for more pixels than the source has;
    /// those variants are written at the source's own size.
    UpscaleAdvisory { image_path: String },
    VariantGenerated { image_path: String, path: PathBuf },
}

/// Result of one successfully processed job.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub image_path: String,
    pub fingerprint: ContentFingerprint,
    #[serde(flatten)]
    pub location: OutputLocation,
    pub status: GenerationStatus,
    pub variants: Vec<Variant>,
    pub tag: String,
}

fn emit(events: Option<&Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching progress.
        tx.send(event).ok();
    }
}

/// Steps 1–5: validate, identify, plan, fingerprint, locate.
pub fn prepare(backend: &impl ImageBackend, job: &ImageJob) -> Result<PreparedImage, PipelineError> {
    let invalid = |source| PipelineError::InvalidConfiguration {
        image: job.image_path.clone(),
        source,
    };
    variant::validate_display_sizes(&job.display_sizes).map_err(invalid)?;
    variant::ordered_densities(&job.densities).map_err(invalid)?;

    let source_path = job.source_path();
    let dims = backend
        .identify(&source_path)
        .map_err(|e| PipelineError::SourceUnreadable {
            path: source_path.clone(),
            reason: e.to_string(),
        })?;
    let source_dimensions = dims.as_tuple();

    let variants = variant::plan(
        &job.display_sizes,
        &job.densities,
        source_dimensions,
        &job.extension(),
    )
    .map_err(invalid)?;
    tracing::debug!(
        image = %job.image_path,
        source_width = source_dimensions.0,
        source_height = source_dimensions.1,
        variants = variants.len(),
        "planned variants"
    );

    let fingerprint = fingerprint::compute(&source_path, &variants).map_err(|e| {
        PipelineError::SourceUnreadable {
            path: source_path.clone(),
            reason: e.to_string(),
        }
    })?;
    let location = OutputLocation::new(
        &job.output_root,
        &job.web_root,
        &job.image_path,
        &fingerprint,
    );

    Ok(PreparedImage {
        source_path,
        image_path: job.image_path.clone(),
        source_dimensions,
        variants,
        fingerprint,
        location,
    })
}

static STAGING_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Hidden sibling of `output_dir`, unique per process and call.
fn staging_dir(output_dir: &Path) -> PathBuf {
    let name = output_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    output_dir.with_file_name(format!(".{name}.partial-{}-{n}", std::process::id()))
}

fn discard_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
    }
}

/// Step 6: make sure the fingerprinted directory holds every variant.
///
/// Performs no resize at all when the directory already exists.
pub fn ensure_generated(
    backend: &impl ImageBackend,
    prepared: &PreparedImage,
    quality: Quality,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<GenerationStatus, PipelineError> {
    let output_dir = &prepared.location.output_dir;
    if prepared.location.exists() {
        emit(
            events,
            PipelineEvent::CacheHit {
                image_path: prepared.image_path.clone(),
                output_dir: output_dir.clone(),
            },
        );
        return Ok(GenerationStatus::Cached);
    }

    let source = backend
        .decode(&prepared.source_path)
        .map_err(|e| PipelineError::SourceUnreadable {
            path: prepared.source_path.clone(),
            reason: e.to_string(),
        })?;

    if variant::any_undersized(&prepared.variants) {
        emit(
            events,
            PipelineEvent::UpscaleAdvisory {
                image_path: prepared.image_path.clone(),
            },
        );
    }

    let staging = staging_dir(output_dir);
    std::fs::create_dir_all(&staging)?;
    tracing::debug!(staging = %staging.display(), "encoding variants");

    let resized: Result<Vec<()>, BackendError> = prepared
        .variants
        .par_iter()
        .map(|v| {
            backend.resize(
                &source,
                &ResizeParams {
                    output: staging.join(v.filename()),
                    width: v.width,
                    height: v.height,
                    quality,
                },
            )
        })
        .collect();
    if let Err(e) = resized {
        discard_staging(&staging);
        return Err(e.into());
    }

    if let Err(e) = std::fs::rename(&staging, output_dir) {
        discard_staging(&staging);
        if prepared.location.exists() {
            tracing::debug!(output_dir = %output_dir.display(), "variant set produced concurrently");
            return Ok(GenerationStatus::Cached);
        }
        return Err(e.into());
    }

    for v in &prepared.variants {
        emit(
            events,
            PipelineEvent::VariantGenerated {
                image_path: prepared.image_path.clone(),
                path: output_dir.join(v.filename()),
            },
        );
    }
    Ok(GenerationStatus::Generated)
}

/// Run one job end to end and render its markup.
pub fn process_image(
    backend: &impl ImageBackend,
    job: &ImageJob,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<GeneratedImage, PipelineError> {
    let prepared = prepare(backend, job)?;
    let status = ensure_generated(backend, &prepared, job.quality, events)?;
    let tag = render_img_tag(
        &prepared.variants,
        &job.display_sizes,
        &prepared.location.web_output_dir,
        &job.attributes,
    );
    Ok(GeneratedImage {
        image_path: prepared.image_path,
        fingerprint: prepared.fingerprint,
        location: prepared.location,
        status,
        variants: prepared.variants,
        tag,
    })
}

/// Run independent jobs in parallel, one result per job in input order.
pub fn process_all(
    backend: &impl ImageBackend,
    jobs: &[ImageJob],
    events: Option<&Sender<PipelineEvent>>,
) -> Vec<Result<GeneratedImage, PipelineError>> {
    jobs.par_iter()
        .map(|job| process_image(backend, job, events))
        .collect()
}

/// Summary of cache behaviour for a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cached: u32,
    pub generated: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn from_results(results: &[Result<GeneratedImage, PipelineError>]) -> Self {
        let mut stats = Self::default();
        for result in results {
            match result {
                Ok(img) if img.status == GenerationStatus::Cached => stats.cached += 1,
                Ok(_) => stats.generated += 1,
                Err(_) => stats.failed += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> u32 {
        self.cached + self.generated + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached, {} generated",
            self.cached, self.generated
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{breakpoint_sizes, create_dummy_source, list_files};
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn test_job(tmp: &Path) -> ImageJob {
        create_dummy_source(&tmp.join("src/photos/dawn.jpg"), b"dawn pixels");
        ImageJob {
            source_root: tmp.join("src"),
            image_path: "photos/dawn.jpg".into(),
            output_root: tmp.join("out"),
            web_root: "/generated".into(),
            display_sizes: breakpoint_sizes(),
            densities: vec![1.0, 2.0],
            attributes: "alt=\"Dawn\"".into(),
            quality: Quality::new(80),
        }
    }

    fn collect(rx: mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        rx.try_iter().collect()
    }

    // =========================================================================
    // Output location
    // =========================================================================

    #[test]
    fn extension_includes_dot() {
        let tmp = TempDir::new().unwrap();
        let mut job = test_job(tmp.path());
        assert_eq!(job.extension(), ".jpg");
        job.image_path = "noext".into();
        assert_eq!(job.extension(), "");
    }

    #[test]
    fn location_appends_fingerprint_prefix() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let prepared = prepare(&MockBackend::with_dimensions(1000, 500), &job).unwrap();

        let suffix = format!("photos/dawn.jpg-{}", prepared.fingerprint.prefix());
        assert_eq!(prepared.location.output_dir, tmp.path().join("out").join(&suffix));
        assert_eq!(
            prepared.location.web_output_dir,
            format!("/generated/{suffix}")
        );
    }

    #[test]
    fn location_trims_trailing_web_slash() {
        let fp = fingerprint::combine("abc", &[]);
        let loc = OutputLocation::new(Path::new("out"), "/web/", "a.jpg", &fp);
        assert_eq!(loc.web_output_dir, format!("/web/a.jpg-{}", fp.prefix()));
    }

    // =========================================================================
    // prepare
    // =========================================================================

    #[test]
    fn prepare_invalid_configuration_does_no_io() {
        let tmp = TempDir::new().unwrap();
        let mut job = test_job(tmp.path());
        job.densities.clear();
        let backend = MockBackend::with_dimensions(1000, 500);

        let result = prepare(&backend, &job);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidConfiguration {
                source: PlanError::EmptyDensities,
                ..
            })
        ));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn prepare_missing_source_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let mut job = test_job(tmp.path());
        job.image_path = "photos/missing.jpg".into();
        // Mock identify succeeds, so the failure comes from reading the bytes
        let result = prepare(&MockBackend::with_dimensions(10, 10), &job);
        assert!(matches!(result, Err(PipelineError::SourceUnreadable { .. })));
    }

    #[test]
    fn prepare_identify_failure_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let result = prepare(&MockBackend::new(), &job);
        assert!(matches!(result, Err(PipelineError::SourceUnreadable { .. })));
    }

    // =========================================================================
    // ensure_generated
    // =========================================================================

    #[test]
    fn first_run_writes_one_file_per_unique_variant() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let backend = MockBackend::with_dimensions(1000, 500);
        let (tx, rx) = mpsc::channel();

        let result = process_image(&backend, &job, Some(&tx)).unwrap();

        assert_eq!(result.status, GenerationStatus::Generated);
        assert_eq!(backend.resize_count(), 3);
        assert_eq!(
            list_files(&result.location.output_dir),
            vec!["1600x.jpg", "400x.jpg", "800x.jpg"]
        );

        let events = collect(rx);
        let advisories = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::UpscaleAdvisory { .. }))
            .count();
        let generated = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::VariantGenerated { .. }))
            .count();
        assert_eq!(advisories, 1);
        assert_eq!(generated, 3);
    }

    #[test]
    fn source_is_decoded_once_per_job() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let backend = MockBackend::with_dimensions(1000, 500);
        process_image(&backend, &job, None).unwrap();

        let decodes = backend
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Decode(_)))
            .count();
        assert_eq!(decodes, 1);
    }

    #[test]
    fn oversized_variant_is_capped_at_source_size() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let backend = MockBackend::with_dimensions(1000, 500);
        process_image(&backend, &job, None).unwrap();

        let capped = backend.get_operations().into_iter().find_map(|op| match op {
            RecordedOp::Resize {
                width: Some(1600),
                actual,
                quality,
                ..
            } => Some((actual, quality)),
            _ => None,
        });
        assert_eq!(capped, Some(((1000, 500), 80)));
    }

    #[test]
    fn second_run_is_a_cache_hit_without_resizes() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        process_image(&MockBackend::with_dimensions(1000, 500), &job, None).unwrap();

        let backend = MockBackend::with_dimensions(1000, 500);
        let (tx, rx) = mpsc::channel();
        let result = process_image(&backend, &job, Some(&tx)).unwrap();

        assert_eq!(result.status, GenerationStatus::Cached);
        assert_eq!(backend.resize_count(), 0);
        let events = collect(rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PipelineEvent::CacheHit { .. }));
    }

    #[test]
    fn changed_source_bytes_miss_the_cache() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let first = process_image(&MockBackend::with_dimensions(1000, 500), &job, None).unwrap();

        std::fs::write(job.source_path(), b"retouched pixels").unwrap();
        let backend = MockBackend::with_dimensions(1000, 500);
        let second = process_image(&backend, &job, None).unwrap();

        assert_eq!(second.status, GenerationStatus::Generated);
        assert_ne!(first.location.output_dir, second.location.output_dir);
        assert_eq!(backend.resize_count(), 3);
    }

    #[test]
    fn no_advisory_when_source_is_large_enough() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let (tx, rx) = mpsc::channel();
        process_image(&MockBackend::with_dimensions(4000, 2000), &job, Some(&tx)).unwrap();

        assert!(
            !collect(rx)
                .iter()
                .any(|e| matches!(e, PipelineEvent::UpscaleAdvisory { .. }))
        );
    }

    #[test]
    fn failed_resize_leaves_no_cache_directory() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let backend = MockBackend::with_dimensions(1000, 500).failing_on("400x.jpg");

        let result = process_image(&backend, &job, None);
        assert!(matches!(
            result,
            Err(PipelineError::Imaging(BackendError::Encode(_)))
        ));

        // Neither the final directory nor a staging leftover remains
        let photos_dir = tmp.path().join("out/photos");
        assert!(list_files(&photos_dir).is_empty());

        // A later healthy run regenerates everything
        let healthy = MockBackend::with_dimensions(1000, 500);
        let retry = process_image(&healthy, &job, None).unwrap();
        assert_eq!(retry.status, GenerationStatus::Generated);
        assert_eq!(healthy.resize_count(), 3);
    }

    #[test]
    fn losing_the_rename_race_reports_cached() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let prepared = prepare(&MockBackend::with_dimensions(1000, 500), &job).unwrap();
        let output_dir = prepared.location.output_dir.clone();
        let backend = MockBackend::with_dimensions(1000, 500).populating_on_resize(&output_dir);
        let (tx, rx) = mpsc::channel();

        let status = ensure_generated(&backend, &prepared, job.quality, Some(&tx)).unwrap();

        assert_eq!(status, GenerationStatus::Cached);
        assert_eq!(backend.resize_count(), 3);
        // The other writer's directory is kept as-is and no staging is left behind
        assert_eq!(list_files(&output_dir), vec!["winner"]);
        let siblings = list_files(output_dir.parent().unwrap());
        assert_eq!(
            siblings,
            vec![output_dir.file_name().unwrap().to_string_lossy().into_owned()]
        );
        assert!(
            !collect(rx)
                .iter()
                .any(|e| matches!(e, PipelineEvent::VariantGenerated { .. }))
        );
    }

    #[test]
    fn identical_jobs_in_parallel_share_one_directory() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let jobs = vec![job.clone(), job.clone(), job];

        let results = process_all(&MockBackend::with_dimensions(1000, 500), &jobs, None);

        assert!(results.iter().all(|r| r.is_ok()));
        let generated = results
            .iter()
            .filter(|r| matches!(r, Ok(img) if img.status == GenerationStatus::Generated))
            .count();
        assert!(generated >= 1);
        let photos = list_files(&tmp.path().join("out/photos"));
        assert_eq!(photos.len(), 1);
        assert!(!photos[0].starts_with('.'));
    }

    #[test]
    fn staging_dirs_are_unique_and_hidden() {
        let dir = Path::new("/out/photos/dawn.jpg-abc1234");
        let a = staging_dir(dir);
        let b = staging_dir(dir);
        assert_ne!(a, b);
        assert_eq!(a.parent(), dir.parent());
        assert!(
            a.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(".dawn.jpg-abc1234.partial-")
        );
    }

    // =========================================================================
    // process_image / process_all
    // =========================================================================

    #[test]
    fn process_image_renders_tag_against_web_dir() {
        let tmp = TempDir::new().unwrap();
        let job = test_job(tmp.path());
        let result = process_image(&MockBackend::with_dimensions(1000, 500), &job, None).unwrap();

        let web = &result.location.web_output_dir;
        assert!(result.tag.starts_with(&format!("<img src=\"{web}/1600x.jpg\"")));
        assert!(result.tag.contains("alt=\"Dawn\""));
        assert!(result.tag.ends_with("/>\n"));
    }

    #[test]
    fn process_all_keeps_input_order_and_isolates_failures() {
        let tmp = TempDir::new().unwrap();
        let good = test_job(tmp.path());
        let mut bad = good.clone();
        bad.image_path = "photos/missing.jpg".into();
        let mut other = good.clone();
        other.image_path = "photos/dusk.jpg".into();
        create_dummy_source(&tmp.path().join("src/photos/dusk.jpg"), b"dusk pixels");

        let results = process_all(
            &MockBackend::with_dimensions(1000, 500),
            &[good, bad, other],
            None,
        );

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().image_path, "photos/dawn.jpg");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().image_path, "photos/dusk.jpg");

        let stats = CacheStats::from_results(&results);
        assert_eq!(
            stats,
            CacheStats {
                cached: 0,
                generated: 2,
                failed: 1
            }
        );
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display() {
        let s = CacheStats {
            cached: 5,
            generated: 2,
            failed: 0,
        };
        assert_eq!(format!("{}", s), "5 cached, 2 generated (7 total)");
    }

    #[test]
    fn cache_stats_display_with_failures() {
        let s = CacheStats {
            cached: 1,
            generated: 1,
            failed: 1,
        };
        assert_eq!(format!("{}", s), "1 cached, 1 generated, 1 failed (3 total)");
    }
}
