use std::path::PathBuf;

use super::job::Job;
use super::settings::Settings;
use crate::pipeline::pass::{PassSettings, ProcessingParams};

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub threshold: u8,
    pub perspective_correction: bool,
    pub marker_size_mm: f64,
    pub canvas_width: u32,
    pub require_calibration: bool,
    pub parallel_workers: usize,
    pub cache_dir: PathBuf,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> crate::error::Result<Self> {
        let marker_size_mm = job.marker_size_mm.unwrap_or(settings.marker_size_mm);
        super::validate_marker_size(marker_size_mm)?;

        Ok(MergedConfig {
            threshold: job.threshold.unwrap_or(settings.threshold),
            perspective_correction: job
                .perspective_correction
                .unwrap_or(settings.perspective_correction),
            marker_size_mm,
            canvas_width: settings.canvas_width,
            require_calibration: job
                .require_calibration
                .unwrap_or(settings.require_calibration),
            parallel_workers: settings.parallel_workers,
            cache_dir: settings.cache_dir.clone(),
        })
    }

    pub fn params(&self) -> ProcessingParams {
        ProcessingParams {
            threshold: self.threshold,
            perspective_correction: self.perspective_correction,
        }
    }

    pub fn pass_settings(&self) -> PassSettings {
        PassSettings {
            marker_size_mm: self.marker_size_mm,
            canvas_width: self.canvas_width,
            require_calibration: self.require_calibration,
        }
    }
}
