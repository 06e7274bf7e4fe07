// Segmenter: rectified image -> inverted binary mask (dark ink = foreground)

use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, warn};

use crate::error::TraceError;
use crate::raster::Raster;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Single-channel 0/255 raster.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    pixels: GrayImage,
}

impl BinaryMask {
    /// All-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::from_pixel(width, height, Luma([BACKGROUND])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn foreground_count(&self) -> usize {
        self.pixels.pixels().filter(|p| p.0[0] == FOREGROUND).count()
    }
}

/// Result of one segmentation.
#[derive(Debug)]
pub struct Segmentation {
    pub mask: BinaryMask,
    /// Best-effort copy of the input for display when segmentation failed.
    pub fallback_display: Option<DynamicImage>,
    pub warning: Option<TraceError>,
}

impl Segmentation {
    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

/// Reduce `image` to intensity, honouring its channel layout.
///
/// 1-, 3- and 4-channel images are accepted at any bit depth.
pub fn to_intensity(raster: &Raster, image: &DynamicImage) -> crate::error::Result<GrayImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TraceError::segmentation(format!(
            "empty input image ({}x{})",
            image.width(),
            image.height()
        )));
    }
    match image.color().channel_count() {
        1 => Ok(match image {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            other => raster.grayscale(other),
        }),
        3 | 4 => Ok(raster.grayscale(image)),
        n => Err(TraceError::segmentation(format!(
            "unexpected channel layout: {n} channels ({:?})",
            image.color()
        ))),
    }
}

/// Inverted global threshold: intensity at or below `threshold` becomes
/// foreground (255), brighter pixels background (0).
pub fn threshold_inverted(gray: &GrayImage, threshold: u8) -> BinaryMask {
    let mut pixels = gray.clone();
    for p in pixels.pixels_mut() {
        p.0[0] = if p.0[0] <= threshold {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }
    BinaryMask { pixels }
}

/// Segment the rectified image into a binary mask.
///
/// On failure the mask is all background (same dimensions), a copy of the
/// input is kept for display and the error is returned as a warning.
pub fn segment(raster: &Raster, image: &DynamicImage, threshold: u8) -> Segmentation {
    match to_intensity(raster, image) {
        Ok(gray) => {
            let mask = threshold_inverted(&gray, threshold);
            debug!(
                width = mask.width(),
                height = mask.height(),
                threshold,
                foreground = mask.foreground_count(),
                "Segmented"
            );
            Segmentation {
                mask,
                fallback_display: None,
                warning: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Segmentation failed; displaying the colour image instead");
            Segmentation {
                mask: BinaryMask::empty(image.width(), image.height()),
                fallback_display: Some(image.clone()),
                warning: Some(e),
            }
        }
    }
}
