// Quad-to-rectangle homography via DLT with Hartley normalization.

use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::error::TraceError;
use crate::geometry::{Point, cross};

/// Minimum |cross| for any three corners of the source quad, in px².
const MIN_CORNER_AREA: f64 = 1e-6;

/// Project a point through a 3×3 homography: H * [x, y, 1]^T → (u, v).
///
/// Returns `None` when the point maps to infinity.
pub fn project(h: &Matrix3<f64>, p: &Point) -> Option<Point> {
    let v = h * Vector3::new(p.x, p.y, 1.0);
    if v[2].abs() < 1e-15 {
        return None;
    }
    let out = Point::new(v[0] / v[2], v[1] / v[2]);
    out.is_finite().then_some(out)
}

/// Translate the centroid to the origin and scale so the mean distance from
/// it is sqrt(2).
fn normalize_points(pts: &[Point]) -> (Matrix3<f64>, Vec<Point>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p.y).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| Point::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();

    (t, normalized)
}

/// Reject quads where any three corners are (nearly) collinear; the
/// four-point homography is singular for them.
fn check_quad(src: &[Point; 4]) -> crate::error::Result<()> {
    for i in 0..4 {
        let a = &src[i];
        let b = &src[(i + 1) % 4];
        let c = &src[(i + 2) % 4];
        let area = cross(a, b, c).abs();
        if !area.is_finite() || area < MIN_CORNER_AREA {
            return Err(TraceError::transform(format!(
                "degenerate quadrilateral: corners {i}..{} are collinear",
                (i + 2) % 4
            )));
        }
    }
    Ok(())
}

/// Estimate the homography mapping four `src` points onto four `dst` points.
///
/// Returns H such that `dst ≈ project(H, src)`, normalized to `H[2][2] = 1`.
pub fn quad_to_quad(src: &[Point; 4], dst: &[Point; 4]) -> crate::error::Result<Matrix3<f64>> {
    check_quad(src)?;
    check_quad(dst)?;

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    // 8 × 9 system A h = 0
    let mut a = DMatrix::<f64>::zeros(8, 9);
    for i in 0..4 {
        let (sx, sy) = (src_n[i].x, src_n[i].y);
        let (dx, dy) = (dst_n[i].x, dst_n[i].y);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // h is the eigenvector of A^T A with the smallest eigenvalue.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);
    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let col = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(
        col[0], col[1], col[2], col[3], col[4], col[5], col[6], col[7], col[8],
    );

    // H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| TraceError::transform("normalizing transform not invertible"))?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if !scale.is_finite() || scale.abs() < 1e-12 {
        return Err(TraceError::transform(
            "homography maps the source origin to infinity",
        ));
    }
    let h = h / scale;

    if h.iter().any(|v| !v.is_finite()) {
        return Err(TraceError::transform("homography has non-finite entries"));
    }
    if h.determinant().abs() < 1e-12 {
        return Err(TraceError::transform("homography is singular"));
    }

    Ok(h)
}
