// Rectifier & calibrator: page quad -> canonical canvas, px/mm from the reference marker

use image::DynamicImage;
use nalgebra::Matrix3;
use tracing::{debug, warn};

use super::boundary::BoundaryQuad;
use super::homography::{project, quad_to_quad};
use crate::error::TraceError;
use crate::geometry::Point;
use crate::markers::MarkerObservation;
use crate::raster::Raster;

/// Pixels per millimetre in the rectified image. Always finite and > 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationScale(f64);

impl CalibrationScale {
    /// Accept a candidate scale; zero, negative and non-finite values are unset.
    pub fn new(px_per_mm: f64) -> Option<Self> {
        (px_per_mm.is_finite() && px_per_mm > 0.0).then_some(Self(px_per_mm))
    }

    pub fn px_per_mm(&self) -> f64 {
        self.0
    }

    /// Pixel distance → millimetres.
    pub fn to_mm(&self, px: f64) -> f64 {
        px / self.0
    }

    /// Millimetres → pixel distance.
    pub fn to_px(&self, mm: f64) -> f64 {
        mm * self.0
    }
}

/// Fixed inputs of the rectifier.
#[derive(Debug, Clone, Copy)]
pub struct RectifyConfig {
    /// Physical edge length of one printed marker.
    pub marker_size_mm: f64,
    /// Width of the output canvas; height follows the source aspect ratio.
    pub canvas_width: u32,
}

/// Output of the rectification stage.
#[derive(Debug)]
pub struct Rectified {
    pub image: DynamicImage,
    pub scale: Option<CalibrationScale>,
    /// `true` when the homography was applied.
    pub corrected: bool,
    /// Recoverable failure that forced the unrectified fallback.
    pub warning: Option<TraceError>,
}

/// Canvas size for a source image: fixed width, height keeping the source
/// aspect ratio.
pub fn canvas_size(source_width: u32, source_height: u32, canvas_width: u32) -> (u32, u32) {
    if source_width == 0 {
        return (canvas_width, 0);
    }
    let height = (canvas_width as f64 * source_height as f64 / source_width as f64).round();
    (canvas_width, height as u32)
}

/// Homography from the page quad (TL, TR, BR, BL) to the canvas corners.
pub fn page_homography(
    quad: &BoundaryQuad,
    width: u32,
    height: u32,
) -> crate::error::Result<Matrix3<f64>> {
    let (w, h) = (width as f64, height as f64);
    let canvas = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ];
    quad_to_quad(&quad.corners(), &canvas)
}

/// Scale from the reference marker's top edge (corners 0 → 1) re-projected
/// through `h`. `None` when the projection fails or the edge collapses.
pub fn calibrate(
    h: &Matrix3<f64>,
    reference: &MarkerObservation,
    marker_size_mm: f64,
) -> Option<CalibrationScale> {
    let a = project(h, &reference.corners[0])?;
    let b = project(h, &reference.corners[1])?;
    CalibrationScale::new(a.distance(&b) / marker_size_mm)
}

/// Rectify `source` when correction is enabled and a page quad is known.
///
/// Every failure path returns the source image unchanged with an unset
/// scale; the error is carried in [`Rectified::warning`].
pub fn rectify(
    raster: &Raster,
    source: DynamicImage,
    quad: Option<&BoundaryQuad>,
    reference: Option<&MarkerObservation>,
    enabled: bool,
    config: &RectifyConfig,
) -> Rectified {
    let quad = match (enabled, quad) {
        (true, Some(q)) => q,
        _ => {
            return Rectified {
                image: source,
                scale: None,
                corrected: false,
                warning: None,
            };
        }
    };

    let (width, height) = canvas_size(source.width(), source.height(), config.canvas_width);

    let warped = page_homography(quad, width, height).and_then(|h| {
        let image = raster.warp_perspective(&source, &h, width, height)?;
        Ok((h, image))
    });

    match warped {
        Ok((h, image)) => {
            let scale = reference.and_then(|m| calibrate(&h, m, config.marker_size_mm));
            if scale.is_none() {
                warn!("Reference marker did not yield a usable scale; output stays in pixels");
            }
            debug!(
                width,
                height,
                scale = ?scale.map(|s| s.px_per_mm()),
                "Perspective corrected"
            );
            Rectified {
                image,
                scale,
                corrected: true,
                warning: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Perspective correction failed; using unrectified image");
            Rectified {
                image: source,
                scale: None,
                corrected: false,
                warning: Some(e),
            }
        }
    }
}
