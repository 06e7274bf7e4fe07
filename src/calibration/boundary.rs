// Boundary resolver: marker corners -> page quadrilateral

use crate::error::TraceError;
use crate::geometry::Point;
use crate::markers::MarkerSet;

/// Physical page corners in image pixel space, tagged by role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryQuad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl BoundaryQuad {
    /// Corners in fixed role order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

/// Resolve the page quadrilateral from every marker corner in the frame.
///
/// Role assignment over the flattened point cloud:
/// - top-left: min (x + y)
/// - bottom-right: max (x + y)
/// - top-right: min (y - x)
/// - bottom-left: max (y - x)
///
/// Ties keep the first point in detection order. This assumes a roughly
/// upright page; rotated pages are not reordered.
pub fn resolve_boundary(markers: &MarkerSet) -> crate::error::Result<BoundaryQuad> {
    let points: Vec<Point> = markers.corner_points().copied().collect();
    if points.len() < 4 {
        return Err(TraceError::InsufficientMarkers {
            found: points.len(),
        });
    }

    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;

    Ok(BoundaryQuad {
        top_left: extreme_by(&points, sum, Extreme::Min),
        top_right: extreme_by(&points, diff, Extreme::Min),
        bottom_right: extreme_by(&points, sum, Extreme::Max),
        bottom_left: extreme_by(&points, diff, Extreme::Max),
    })
}

#[derive(Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

/// Linear scan keeping the first point that strictly improves the key.
fn extreme_by(points: &[Point], key: impl Fn(&Point) -> f64, extreme: Extreme) -> Point {
    let mut best = points[0];
    let mut best_key = key(&best);
    for p in &points[1..] {
        let k = key(p);
        let better = match extreme {
            Extreme::Min => k < best_key,
            Extreme::Max => k > best_key,
        };
        if better {
            best = *p;
            best_key = k;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerObservation;

    fn marker(id: i32, x: f64, y: f64, size: f64) -> MarkerObservation {
        MarkerObservation {
            id,
            corners: [
                Point::new(x, y),
                Point::new(x + size, y),
                Point::new(x + size, y + size),
                Point::new(x, y + size),
            ],
        }
    }

    #[test]
    fn test_single_marker_is_enough_points() {
        let set = MarkerSet::new(vec![marker(0, 10.0, 20.0, 5.0)]);
        let quad = resolve_boundary(&set).unwrap();
        assert_eq!(quad.top_left, Point::new(10.0, 20.0));
        assert_eq!(quad.top_right, Point::new(15.0, 20.0));
        assert_eq!(quad.bottom_right, Point::new(15.0, 25.0));
        assert_eq!(quad.bottom_left, Point::new(10.0, 25.0));
    }

    #[test]
    fn test_four_markers_pick_outer_corners() {
        let set = MarkerSet::new(vec![
            marker(0, 10.0, 10.0, 20.0),
            marker(1, 470.0, 12.0, 20.0),
            marker(2, 468.0, 370.0, 20.0),
            marker(3, 8.0, 372.0, 20.0),
        ]);
        let quad = resolve_boundary(&set).unwrap();
        assert_eq!(quad.top_left, Point::new(10.0, 10.0));
        assert_eq!(quad.top_right, Point::new(490.0, 12.0));
        assert_eq!(quad.bottom_right, Point::new(488.0, 390.0));
        assert_eq!(quad.bottom_left, Point::new(8.0, 392.0));
    }

    #[test]
    fn test_empty_set_is_insufficient() {
        let err = resolve_boundary(&MarkerSet::default()).unwrap_err();
        assert!(matches!(err, TraceError::InsufficientMarkers { found: 0 }));
    }

    #[test]
    fn test_tie_keeps_first_point() {
        // (0, 10) and (10, 0) share x + y = 10; both minimize it.
        let set = MarkerSet::new(vec![MarkerObservation {
            id: 0,
            corners: [
                Point::new(0.0, 10.0),
                Point::new(10.0, 0.0),
                Point::new(20.0, 20.0),
                Point::new(30.0, 30.0),
            ],
        }]);
        let quad = resolve_boundary(&set).unwrap();
        assert_eq!(quad.top_left, Point::new(0.0, 10.0));
    }
}
