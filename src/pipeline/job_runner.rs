// ジョブ単位: 画像読込 -> キャッシュ確認 -> パス実行 -> SVG書き出し

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::buffers::BufferLedger;
use super::pass::{PassSettings, ProcessingParams, run_pass};
use crate::cache::hash::{CacheSettings, compute_cache_key};
use crate::cache::store::{CacheStore, CachedDocument};
use crate::error::TraceError;
use crate::export::{self, ExportRecord};
use crate::markers::MarkerSet;
use crate::raster::RasterRuntime;
use crate::trace::OutputUnit;

/// Configuration for a single job.
pub struct JobConfig {
    pub input_path: PathBuf,
    pub markers_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub params: ProcessingParams,
    pub settings: PassSettings,
    pub cache_dir: Option<PathBuf>,
}

impl JobConfig {
    fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            threshold: self.params.threshold,
            perspective_correction: self.params.perspective_correction,
            marker_size_mm: self.settings.marker_size_mm,
            canvas_width: self.settings.canvas_width,
            require_calibration: self.settings.require_calibration,
        }
    }
}

/// Result of processing a single job.
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub path_count: usize,
    pub unit: OutputUnit,
    /// Fallbacks taken by the pass, as display messages.
    pub warnings: Vec<String>,
    pub cache_hit: bool,
    pub export: ExportRecord,
}

/// Run one tracing job: one synchronous pass, then an atomic SVG write.
///
/// With a cache directory configured, an identical (image, markers,
/// settings) triple reuses the stored SVG instead of running the pass.
pub fn run_job(runtime: &RasterRuntime, config: &JobConfig) -> crate::error::Result<JobResult> {
    let image_bytes = std::fs::read(&config.input_path).map_err(|e| {
        TraceError::decode(format!("cannot read {}: {e}", config.input_path.display()))
    })?;
    let markers = config
        .markers_path
        .as_deref()
        .map(MarkerSet::from_file)
        .transpose()?;

    let cache_store = config.cache_dir.as_ref().map(CacheStore::new);
    let cache_key = compute_cache_key(&image_bytes, markers.as_ref(), &config.cache_settings());

    if let Some(store) = &cache_store {
        match store.retrieve(&cache_key) {
            Ok(Some(cached)) => {
                debug!(key = %cache_key, "Cache hit");
                let export = export::write_svg_markup(&config.output_path, &cached.svg)?;
                return Ok(JobResult {
                    input_path: config.input_path.clone(),
                    output_path: config.output_path.clone(),
                    path_count: cached.path_count,
                    unit: cached.unit,
                    warnings: cached.warnings,
                    cache_hit: true,
                    export,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(key = %cache_key, error = %e, "Ignoring unreadable cache entry"),
        }
    }

    let raster = runtime.acquire()?;
    let source = raster.decode(&image_bytes)?;
    // ジョブごとに独立したバッファ台帳を使う
    let ledger = BufferLedger::new();
    let output = run_pass(
        &raster,
        source,
        markers.as_ref(),
        &config.params,
        &config.settings,
        &ledger,
    )?;

    let svg = output.document.to_svg();
    let warnings: Vec<String> = output.warnings.iter().map(ToString::to_string).collect();
    let path_count = output.document.paths().len();
    let unit = output.document.unit();
    drop(output);

    if let Some(store) = &cache_store {
        let entry = CachedDocument {
            svg: svg.clone(),
            path_count,
            unit,
            warnings: warnings.clone(),
        };
        if let Err(e) = store.store(&cache_key, &entry) {
            warn!(key = %cache_key, error = %e, "Failed to store cache entry");
        }
    }

    let export = export::write_svg_markup(&config.output_path, &svg)?;
    info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        paths = path_count,
        "Job complete"
    );

    Ok(JobResult {
        input_path: config.input_path.clone(),
        output_path: config.output_path.clone(),
        path_count,
        unit,
        warnings,
        cache_hit: false,
        export,
    })
}

/// Run multiple jobs in parallel, collecting results in input order.
/// One job failure does NOT prevent other jobs from running.
///
/// `workers == 0` uses the global rayon pool.
pub fn run_all_jobs(
    runtime: &RasterRuntime,
    jobs: &[JobConfig],
    workers: usize,
) -> crate::error::Result<Vec<crate::error::Result<JobResult>>> {
    let run = || -> Vec<crate::error::Result<JobResult>> {
        jobs.par_iter().map(|job| run_job(runtime, job)).collect()
    };
    if workers == 0 {
        return Ok(run());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| TraceError::config(format!("cannot build worker pool: {e}")))?;
    Ok(pool.install(run))
}
