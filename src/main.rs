use clap::{Parser, Subcommand};
use srcset_gen::imaging::{ImageBackend, RustBackend};
use srcset_gen::pipeline::{self, CacheStats, ImageJob};
use srcset_gen::{config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "srcset-gen")]
#[command(about = "Generate responsive image variants and srcset markup")]
#[command(long_about = "\
Generate responsive image variants and srcset markup

For every image, each display size is multiplied by each pixel density and
the source is resized (never upscaled) to every distinct result. Variants are
written to a directory named after the image and a content fingerprint:

  <output_root>/<image path>-<fingerprint>/
  ├── 400x.jpg
  ├── 800x.jpg
  └── 1600x.jpg

An existing directory is reused as-is, so unchanged images cost one hash.

Run 'srcset-gen gen-config' to generate a documented srcset.toml.")]
#[command(version)]
struct Cli {
    /// Config file; relative roots inside it resolve against its directory
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate missing variants and print an <img> tag per image
    Build {
        /// Also write a JSON manifest of the results
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Show the planned variants per image without encoding anything
    Plan,
    /// Validate config and confirm every source image is readable
    Check,
    /// Print a stock srcset.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build { manifest } => {
            let (site_config, jobs) = load_jobs(&cli.config)?;
            init_thread_pool(&site_config.processing);
            tracing::info!(jobs = jobs.len(), "starting build");

            let backend = RustBackend::new();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_pipeline_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let results = pipeline::process_all(&backend, &jobs, Some(&tx));
            drop(tx);
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            let stats = CacheStats::from_results(&results);
            output::print_build_output(&results, &stats);

            if let Some(path) = manifest {
                let generated: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
                let json = serde_json::to_string_pretty(&generated)?;
                std::fs::write(&path, json)?;
                tracing::info!(path = %path.display(), "wrote manifest");
            }

            if stats.failed > 0 {
                return Err(format!("{} of {} images failed", stats.failed, stats.total()).into());
            }
        }
        Command::Plan => {
            let (_, jobs) = load_jobs(&cli.config)?;
            let backend = RustBackend::new();
            let mut failed = 0;
            for job in &jobs {
                match pipeline::prepare(&backend, job) {
                    Ok(prepared) => output::print_plan(&prepared),
                    Err(e) => {
                        failed += 1;
                        println!("Error: {e}");
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} images could not be planned", jobs.len()).into());
            }
        }
        Command::Check => {
            let (_, jobs) = load_jobs(&cli.config)?;
            println!("==> Checking {} images", jobs.len());
            let backend = RustBackend::new();
            let results: Vec<_> = jobs.iter().map(|job| check_job(&backend, job)).collect();
            let failed = results.iter().filter(|r| r.is_err()).count();
            let lines = output::format_check(
                jobs.iter()
                    .map(|job| job.image_path.as_str())
                    .zip(results),
            );
            for line in lines {
                println!("{}", line);
            }
            if failed > 0 {
                return Err(format!("{failed} of {} images failed checks", jobs.len()).into());
            }
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config and resolve it into jobs relative to the config's directory.
fn load_jobs(
    config_path: &Path,
) -> Result<(config::SrcsetConfig, Vec<ImageJob>), config::ConfigError> {
    let site_config = config::load_config(config_path)?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let jobs = site_config.jobs(base_dir)?;
    Ok((site_config, jobs))
}

fn check_job(backend: &impl ImageBackend, job: &ImageJob) -> Result<(), String> {
    pipeline::prepare(backend, job)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
