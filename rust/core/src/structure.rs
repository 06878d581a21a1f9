// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structures derived from footprints and the feature table built from them

use buildgen_geometry::Point2D;
use serde::{Deserialize, Serialize};

use crate::height::HeightSource;
use crate::tags::Classification;

/// Rectangular reduction of one footprint, in footprint units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// Position among the structures that survived processing
    pub index: usize,
    /// Position of the source record in the input batch
    pub record: usize,
    pub center: Point2D,
    /// Degrees in `[0, 360)`
    pub rotation: f64,
    /// Longer side
    pub length: f64,
    /// Shorter side
    pub width: f64,
    /// Meters
    pub height: f64,
    pub height_source: HeightSource,
    pub height_provenance: String,
    pub classification: Classification,
    pub name: Option<String>,
}

impl Structure {
    pub fn footprint_area(&self) -> f64 {
        self.length * self.width
    }

    /// Detailed structures carry at least one specific classification tag
    pub fn is_detailed(&self) -> bool {
        self.classification.detailed
    }
}

/// Columns of a [`FeatureRow`], in output order
pub const FEATURE_COLUMNS: [&str; 8] = [
    "index", "height", "area", "radius", "angle", "x_offset", "y_offset", "detailed",
];

/// One row of the feature table, target units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub index: usize,
    pub height: f64,
    pub area: f64,
    /// Distance from the centroid of all structures
    pub radius: f64,
    /// Bearing from the centroid, degrees in `[0, 360)`
    pub angle: f64,
    pub x_offset: f64,
    pub y_offset: f64,
    pub detailed: bool,
}

impl FeatureRow {
    pub fn total_size(&self) -> f64 {
        self.height * self.area
    }

    pub fn to_array(&self) -> [f64; 8] {
        [
            self.index as f64,
            self.height,
            self.area,
            self.radius,
            self.angle,
            self.x_offset,
            self.y_offset,
            if self.detailed { 1.0 } else { 0.0 },
        ]
    }
}

/// Per-structure numeric summary relative to the centroid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    /// Centroid of the structure centers, footprint units
    /// (kilometers when the footprints were projected)
    pub world_center: Point2D,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&FeatureRow> {
        self.rows.get(index)
    }
}
