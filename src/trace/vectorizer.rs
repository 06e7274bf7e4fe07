// Vectorizer: binary mask -> simplified outer contours -> scaled document

use tracing::debug;

use super::document::{ContourPolygon, OutputUnit, VectorDocument, ViewBox};
use super::segmenter::BinaryMask;
use crate::calibration::CalibrationScale;
use crate::geometry::Point;
use crate::raster::Raster;

/// Douglas-Peucker tolerance as a fraction of the closed contour perimeter.
pub const SIMPLIFY_PERIMETER_RATIO: f64 = 0.002;

const PADDING_MM: f64 = 5.0;
const PADDING_PX_LARGE: f64 = 20.0;
const PADDING_PX_SMALL: f64 = 10.0;
/// Images wider than this get the large pixel padding.
const LARGE_IMAGE_PX: u32 = 200;

const FALLBACK_SIZE_MM: f64 = 100.0;
const FALLBACK_WIDTH_PX: f64 = 300.0;
const FALLBACK_HEIGHT_PX: f64 = 200.0;

const STROKE_MM: f64 = 0.5;
const STROKE_PX: f64 = 1.0;

/// Running axis-aligned bounds over converted points.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, p: &Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }
}

/// Pixel coordinate → output unit (mm when calibrated, px otherwise).
fn to_output(scale: Option<CalibrationScale>, v: f64) -> f64 {
    match scale {
        Some(s) => s.to_mm(v),
        None => v,
    }
}

/// Visual margin around the traced bounds.
pub fn padding(scale: Option<CalibrationScale>, mask_width: u32) -> f64 {
    match scale {
        Some(_) => PADDING_MM,
        None if mask_width > LARGE_IMAGE_PX => PADDING_PX_LARGE,
        None => PADDING_PX_SMALL,
    }
}

/// Extract, simplify and convert the outer contours of `mask`.
pub fn trace_polygons(
    raster: &Raster,
    mask: &BinaryMask,
    scale: Option<CalibrationScale>,
) -> Vec<ContourPolygon> {
    let contours = raster.outer_contours(mask.as_gray());
    let found = contours.len();

    let polygons: Vec<ContourPolygon> = contours
        .iter()
        .filter_map(|contour| {
            let epsilon = SIMPLIFY_PERIMETER_RATIO * raster.perimeter(contour);
            let simplified = if epsilon > 0.0 {
                raster.simplify_closed(contour, epsilon)
            } else {
                contour.clone()
            };
            if simplified.len() < 2 {
                return None;
            }
            let points = simplified
                .iter()
                .map(|p| {
                    Point::new(
                        to_output(scale, p.x as f64),
                        to_output(scale, p.y as f64),
                    )
                })
                .collect();
            Some(ContourPolygon { points })
        })
        .collect();

    debug!(found, retained = polygons.len(), "Contours simplified");
    polygons
}

/// Compute the document viewBox for the retained polygons.
///
/// Empty input or non-finite bounds fall back to the full mask extent;
/// non-positive sizes are replaced by fixed fallback sizes.
pub fn compute_view_box(
    polygons: &[ContourPolygon],
    mask_width: u32,
    mask_height: u32,
    scale: Option<CalibrationScale>,
) -> ViewBox {
    let mut bounds = Bounds::new();
    for p in polygons.iter().flat_map(|poly| poly.points.iter()) {
        bounds.include(p);
    }

    let mut view_box = if !polygons.is_empty() && bounds.is_finite() {
        let pad = padding(scale, mask_width);
        ViewBox {
            min_x: bounds.min_x - pad,
            min_y: bounds.min_y - pad,
            width: bounds.max_x - bounds.min_x + 2.0 * pad,
            height: bounds.max_y - bounds.min_y + 2.0 * pad,
        }
    } else {
        ViewBox {
            min_x: 0.0,
            min_y: 0.0,
            width: to_output(scale, mask_width as f64),
            height: to_output(scale, mask_height as f64),
        }
    };

    if !(view_box.width > 0.0 && view_box.width.is_finite()) {
        view_box.width = match scale {
            Some(_) => FALLBACK_SIZE_MM,
            None if mask_width > 0 => mask_width as f64,
            None => FALLBACK_WIDTH_PX,
        };
    }
    if !(view_box.height > 0.0 && view_box.height.is_finite()) {
        view_box.height = match scale {
            Some(_) => FALLBACK_SIZE_MM,
            None if mask_height > 0 => mask_height as f64,
            None => FALLBACK_HEIGHT_PX,
        };
    }
    view_box
}

/// Build the vector document for `mask`.
pub fn vectorize(
    raster: &Raster,
    mask: &BinaryMask,
    scale: Option<CalibrationScale>,
) -> VectorDocument {
    let polygons = trace_polygons(raster, mask, scale);
    let view_box = compute_view_box(&polygons, mask.width(), mask.height(), scale);
    let (unit, stroke_width) = match scale {
        Some(_) => (OutputUnit::Millimeter, STROKE_MM),
        None => (OutputUnit::Pixel, STROKE_PX),
    };
    VectorDocument::new(polygons, view_box, unit, stroke_width)
}
