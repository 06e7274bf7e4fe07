use std::path::{Path, PathBuf};
use std::process::ExitCode;

use drawtrace::config::job::JobFile;
use drawtrace::config::merged::MergedConfig;
use drawtrace::config::{self};
use drawtrace::pipeline::job_runner::{JobConfig, run_all_jobs};
use drawtrace::raster::RasterRuntime;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: drawtrace <jobs.yaml>...");
        eprintln!("  Trace photographed drawings into SVG according to job specifications.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("drawtrace {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut job_configs: Vec<JobConfig> = Vec::new();
    let mut workers = 0usize;

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for job in &job_file.jobs {
            let merged = match MergedConfig::new(&settings, job) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("ERROR: {}: {e}", job.input);
                    return ExitCode::FAILURE;
                }
            };
            workers = workers.max(merged.parallel_workers);

            job_configs.push(JobConfig {
                input_path: resolve_path(&job_dir, &job.input),
                markers_path: job.markers.as_deref().map(|m| resolve_path(&job_dir, m)),
                output_path: resolve_path(&job_dir, &job.output),
                params: merged.params(),
                settings: merged.pass_settings(),
                // 絶対パスの cache_dir は join でそのまま置き換わる
                cache_dir: Some(job_dir.join(&merged.cache_dir)),
            });
        }
    }

    let runtime = match RasterRuntime::initialize() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let results = match run_all_jobs(&runtime, &job_configs, workers) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };
    runtime.shutdown();

    let mut has_error = false;
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} -> {} ({} paths, {})",
                    job_result.input_path.display(),
                    job_result.output_path.display(),
                    job_result.path_count,
                    job_result.unit.suffix()
                );
                for warning in &job_result.warnings {
                    eprintln!("  WARNING: {warning}");
                }
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} -> {}: {e}",
                    job_configs[i].input_path.display(),
                    job_configs[i].output_path.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
