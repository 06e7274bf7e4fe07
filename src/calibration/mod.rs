pub mod boundary;
pub mod homography;
pub mod rectify;

pub use boundary::{BoundaryQuad, resolve_boundary};
pub use rectify::{CalibrationScale, RectifyConfig, Rectified, rectify};
