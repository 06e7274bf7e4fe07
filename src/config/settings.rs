use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub threshold: u8,
    pub perspective_correction: bool,
    pub marker_size_mm: f64,
    pub canvas_width: u32,
    pub require_calibration: bool,
    pub debounce_ms: u64,
    pub parallel_workers: usize,
    pub cache_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            threshold: 128,
            perspective_correction: true,
            marker_size_mm: 50.0,
            canvas_width: 600,
            require_calibration: false,
            debounce_ms: 150,
            parallel_workers: 0,
            cache_dir: PathBuf::from(".cache"),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::TraceError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 物理寸法とキャンバス幅の妥当性を検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        super::validate_marker_size(self.marker_size_mm)?;
        if self.canvas_width == 0 {
            return Err(crate::error::TraceError::config(
                "canvas_width must be greater than 0",
            ));
        }
        Ok(())
    }
}
