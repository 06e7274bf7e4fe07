// image / imageproc wrappers: decode, grayscale, perspective warp, contours

use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point as PixelPoint;
use nalgebra::Matrix3;

use crate::error::TraceError;

/// Fill colour for canvas pixels that map outside the source image.
const WARP_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Stateless handle to the raster primitives.
///
/// Obtained from [`super::RasterRuntime::acquire`]; all methods are pure
/// functions over the given buffers.
#[derive(Debug, Default)]
pub struct Raster {
    _private: (),
}

impl Raster {
    pub(super) fn new() -> Self {
        Self { _private: () }
    }

    pub fn backend_name(&self) -> &'static str {
        "imageproc"
    }

    /// Decode encoded image bytes (PNG, JPEG, ...).
    pub fn decode(&self, bytes: &[u8]) -> crate::error::Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(TraceError::decode("image data is empty"));
        }
        let image = image::load_from_memory(bytes)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TraceError::decode(format!(
                "decoded image has zero size ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(image)
    }

    /// Luma conversion (ITU-R 601 weights as applied by the `image` crate).
    pub fn grayscale(&self, image: &DynamicImage) -> GrayImage {
        image.to_luma8()
    }

    /// Warp `image` through `h` (source px → canvas px) into a
    /// `width` × `height` canvas with bilinear sampling.
    pub fn warp_perspective(
        &self,
        image: &DynamicImage,
        h: &Matrix3<f64>,
        width: u32,
        height: u32,
    ) -> crate::error::Result<DynamicImage> {
        if width == 0 || height == 0 {
            return Err(TraceError::transform(format!(
                "invalid output canvas size {width}x{height}"
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(TraceError::transform("source image is empty"));
        }

        let mut matrix = [0f32; 9];
        for r in 0..3 {
            for c in 0..3 {
                matrix[r * 3 + c] = h[(r, c)] as f32;
            }
        }
        let projection = Projection::from_matrix(matrix)
            .ok_or_else(|| TraceError::transform("perspective matrix is not invertible"))?;

        let source = image.to_rgba8();
        let mut canvas = RgbaImage::new(width, height);
        warp_into(
            &source,
            &projection,
            Interpolation::Bilinear,
            WARP_FILL,
            &mut canvas,
        );
        Ok(DynamicImage::ImageRgba8(canvas))
    }

    /// Outermost borders of the foreground (non-zero) regions of `mask`.
    ///
    /// Hole borders and regions nested inside holes are skipped.
    pub fn outer_contours(&self, mask: &GrayImage) -> Vec<Vec<PixelPoint<i32>>> {
        find_contours::<i32>(mask)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| c.points)
            .collect()
    }

    /// Closed perimeter of a contour.
    pub fn perimeter(&self, contour: &[PixelPoint<i32>]) -> f64 {
        arc_length(contour, true)
    }

    /// Douglas-Peucker simplification of a closed contour.
    pub fn simplify_closed(
        &self,
        contour: &[PixelPoint<i32>],
        epsilon: f64,
    ) -> Vec<PixelPoint<i32>> {
        if contour.len() < 3 {
            return contour.to_vec();
        }
        approximate_polygon_dp(contour, epsilon, true)
    }
}
