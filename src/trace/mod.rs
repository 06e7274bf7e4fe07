pub mod document;
pub mod segmenter;
pub mod vectorizer;

pub use document::{ContourPolygon, OutputUnit, VectorDocument, ViewBox};
pub use segmenter::{BinaryMask, Segmentation, segment};
pub use vectorizer::vectorize;
