// Capture surface hand-off: detected fiducial markers for one frame.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::geometry::Point;

/// One detected fiducial marker: identifier plus its four corners in the
/// detector's winding order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub id: i32,
    pub corners: [Point; 4],
}

/// All markers seen in one frame, in detection order. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerSet {
    pub markers: Vec<MarkerObservation>,
}

impl MarkerSet {
    pub fn new(markers: Vec<MarkerObservation>) -> Self {
        Self { markers }
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// The marker whose top edge calibrates the physical scale.
    pub fn reference(&self) -> Option<&MarkerObservation> {
        self.markers.first()
    }

    /// All corner points of all markers, flattened in detection order.
    pub fn corner_points(&self) -> impl Iterator<Item = &Point> {
        self.markers.iter().flat_map(|m| m.corners.iter())
    }

    /// Parse a markers JSON document: `[{"id": 0, "corners": [[x, y], ...]}]`.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TraceError::config(format!("Failed to parse markers JSON: {e}")))
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Canonical JSON encoding used for cache keys.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self)
            .expect("serializing numeric marker data to JSON must not fail")
    }
}
