pub mod cache;
pub mod calibration;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod markers;
pub mod pipeline;
pub mod raster;
pub mod trace;
