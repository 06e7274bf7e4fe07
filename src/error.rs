use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Insufficient markers: need at least 4 corner points, found {found}")]
    InsufficientMarkers { found: usize },

    #[error("Transform failure: {0}")]
    TransformFailure(String),

    #[error("Segmentation failure: {0}")]
    SegmentationFailure(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Vectorization produced no contours")]
    VectorizationEmpty,

    #[error("Raster capability unavailable: {0}")]
    RasterUnavailable(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`TraceError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl TraceError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a transform (homography / warp) failure.
    transform => TransformFailure,
    /// Create a segmentation failure.
    segmentation => SegmentationFailure,
    /// Create an image decode failure.
    decode => DecodeFailure,
    /// Create a raster-unavailable error.
    raster_unavailable => RasterUnavailable,
    /// Create an export error.
    export => ExportError,
    /// Create a cache error.
    cache => CacheError,
}

impl TraceError {
    /// Stage-local failures that degrade to a fallback output instead of
    /// aborting the pass.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransformFailure(_)
                | Self::SegmentationFailure(_)
                | Self::InsufficientMarkers { .. }
                | Self::VectorizationEmpty
        )
    }
}

impl From<serde_json::Error> for TraceError {
    fn from(e: serde_json::Error) -> Self {
        Self::CacheError(e.to_string())
    }
}

impl From<serde_yml::Error> for TraceError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<image::ImageError> for TraceError {
    fn from(e: image::ImageError) -> Self {
        Self::DecodeFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;
