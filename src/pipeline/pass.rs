// One processing pass: boundary -> rectify/calibrate -> segment -> vectorize

use image::DynamicImage;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::buffers::{BufferLedger, Tracked};
use crate::calibration::{
    BoundaryQuad, CalibrationScale, RectifyConfig, rectify, resolve_boundary,
};
use crate::error::TraceError;
use crate::markers::MarkerSet;
use crate::raster::Raster;
use crate::trace::{VectorDocument, segment, vectorize};

/// User-tunable controls. Any change invalidates rectification onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessingParams {
    pub threshold: u8,
    pub perspective_correction: bool,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            threshold: 128,
            perspective_correction: true,
        }
    }
}

/// Fixed per-pipeline inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassSettings {
    pub marker_size_mm: f64,
    pub canvas_width: u32,
    /// Fail the pass instead of degrading when markers are insufficient.
    pub require_calibration: bool,
}

impl Default for PassSettings {
    fn default() -> Self {
        Self {
            marker_size_mm: 50.0,
            canvas_width: 600,
            require_calibration: false,
        }
    }
}

/// Result of a successful pass.
#[derive(Debug)]
pub struct PassOutput {
    pub document: VectorDocument,
    /// Raster shown next to the tracing: the binary mask, or a copy of the
    /// colour image when segmentation fell back.
    pub display: Tracked<DynamicImage>,
    pub scale: Option<CalibrationScale>,
    /// `true` when the perspective homography was applied.
    pub corrected: bool,
    /// Recoverable failures absorbed by this pass.
    pub warnings: Vec<TraceError>,
}

impl PassOutput {
    /// `true` when a stage fell back (an empty tracing alone is not degraded).
    pub fn is_degraded(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| !matches!(w, TraceError::VectorizationEmpty))
    }
}

/// Resolve the page quad when correction is on.
///
/// Missing or insufficient markers degrade to `None` plus a warning, or fail
/// outright when calibration is required.
fn resolve_quad(
    markers: Option<&MarkerSet>,
    params: &ProcessingParams,
    settings: &PassSettings,
    warnings: &mut Vec<TraceError>,
) -> crate::error::Result<Option<BoundaryQuad>> {
    if !params.perspective_correction {
        return Ok(None);
    }
    let resolved = match markers {
        Some(set) => resolve_boundary(set),
        None => Err(TraceError::InsufficientMarkers { found: 0 }),
    };
    match resolved {
        Ok(quad) => Ok(Some(quad)),
        Err(e) if settings.require_calibration || !e.is_recoverable() => Err(e),
        Err(e) => {
            warn!(error = %e, "Boundary unresolved; continuing without perspective correction");
            warnings.push(e);
            Ok(None)
        }
    }
}

/// Run all stages synchronously over a decoded source image.
///
/// Intermediate buffers are tracked in `ledger` and released before this
/// function returns, on success and on every error path; only
/// [`PassOutput::display`] outlives the pass.
#[instrument(skip_all, fields(
    width = source.width(),
    height = source.height(),
    threshold = params.threshold,
    correction = params.perspective_correction,
))]
pub fn run_pass(
    raster: &Raster,
    source: DynamicImage,
    markers: Option<&MarkerSet>,
    params: &ProcessingParams,
    settings: &PassSettings,
    ledger: &BufferLedger,
) -> crate::error::Result<PassOutput> {
    let mut warnings = Vec::new();

    let quad = resolve_quad(markers, params, settings, &mut warnings)?;
    let reference = markers.and_then(MarkerSet::reference);

    let rectify_config = RectifyConfig {
        marker_size_mm: settings.marker_size_mm,
        canvas_width: settings.canvas_width,
    };
    let rectified = rectify(
        raster,
        source,
        quad.as_ref(),
        reference,
        params.perspective_correction,
        &rectify_config,
    );
    warnings.extend(rectified.warning);
    let scale = rectified.scale;
    let corrected = rectified.corrected;
    let rectified_image = ledger.track("rectified", rectified.image);

    let segmentation = segment(raster, &rectified_image, params.threshold);
    let mask = ledger.track("mask", segmentation.mask);
    warnings.extend(segmentation.warning);

    let document = vectorize(raster, &mask, scale);
    if document.paths().is_empty() {
        warnings.push(TraceError::VectorizationEmpty);
    }

    let display = match segmentation.fallback_display {
        Some(colour) => ledger.track("display", colour),
        None => ledger.track(
            "display",
            DynamicImage::ImageLuma8(mask.as_gray().clone()),
        ),
    };

    info!(
        paths = document.paths().len(),
        unit = document.unit().suffix(),
        corrected,
        warnings = warnings.len(),
        "Pass complete"
    );

    Ok(PassOutput {
        document,
        display,
        scale,
        corrected,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::markers::MarkerObservation;
    use image::{Rgb, RgbImage};

    fn white_with_box(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for y in 100..200 {
            for x in 100..300 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_no_markers_stays_in_pixels() {
        let ledger = BufferLedger::new();
        let out = run_pass(
            &Raster::default(),
            white_with_box(640, 480),
            None,
            &ProcessingParams::default(),
            &PassSettings::default(),
            &ledger,
        )
        .unwrap();
        assert!(!out.corrected);
        assert!(out.scale.is_none());
        assert!(out.document.width_attr().ends_with("px"));
        assert!(matches!(
            out.warnings.as_slice(),
            [TraceError::InsufficientMarkers { found: 0 }]
        ));
        assert_eq!(out.document.paths().len(), 1);
        // only the display buffer survives the pass
        assert_eq!(ledger.live(), 1);
        drop(out);
        assert_eq!(ledger.live(), 0);
    }

    #[test]
    fn test_required_calibration_fails_without_markers() {
        let ledger = BufferLedger::new();
        let settings = PassSettings {
            require_calibration: true,
            ..PassSettings::default()
        };
        let err = run_pass(
            &Raster::default(),
            white_with_box(640, 480),
            Some(&MarkerSet::default()),
            &ProcessingParams::default(),
            &settings,
            &ledger,
        )
        .unwrap_err();
        assert!(matches!(err, TraceError::InsufficientMarkers { found: 0 }));
        assert_eq!(ledger.live(), 0);
    }

    #[test]
    fn test_correction_disabled_ignores_markers() {
        let markers = MarkerSet::new(vec![MarkerObservation {
            id: 0,
            corners: [
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
        }]);
        let params = ProcessingParams {
            perspective_correction: false,
            ..ProcessingParams::default()
        };
        let out = run_pass(
            &Raster::default(),
            white_with_box(640, 480),
            Some(&markers),
            &params,
            &PassSettings::default(),
            &BufferLedger::new(),
        )
        .unwrap();
        assert!(!out.corrected);
        assert!(out.warnings.is_empty());
        assert!(!out.is_degraded());
    }
}
