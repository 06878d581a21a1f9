// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Re-centering structures on their common centroid and building the
//! feature table.

use buildgen_geometry::Point2D;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::structure::{FeatureRow, FeatureTable, Structure};

/// Offset of one structure from the centroid, target units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarOffset {
    pub dx: f64,
    pub dy: f64,
    pub radius: f64,
    /// Degrees in `[0, 360)`
    pub angle: f64,
}

impl PolarOffset {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self {
            dx,
            dy,
            radius: dx.hypot(dy),
            angle: dy.atan2(dx).to_degrees().rem_euclid(360.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Localization {
    /// Centroid in target units
    pub centroid: Point2D,
    /// Centroid in footprint units, kilometers when projected
    pub world_center: Point2D,
    pub offsets: Vec<PolarOffset>,
}

/// Express centers relative to their centroid, scaled by `unit_factor`.
pub fn localize(centers: &[Point2D], unit_factor: f64, projected: bool) -> Localization {
    if centers.is_empty() {
        return Localization::default();
    }

    let scaled: Vec<Point2D> = centers
        .iter()
        .map(|c| Point2D::new(c.x * unit_factor, c.y * unit_factor))
        .collect();
    let n = scaled.len() as f64;
    let centroid = Point2D::new(
        scaled.iter().map(|p| p.x).sum::<f64>() / n,
        scaled.iter().map(|p| p.y).sum::<f64>() / n,
    );

    let offsets = scaled
        .iter()
        .map(|p| PolarOffset::new(p.x - centroid.x, p.y - centroid.y))
        .collect();

    let mut world_center = Point2D::new(centroid.x / unit_factor, centroid.y / unit_factor);
    if projected {
        world_center = Point2D::new(world_center.x / 1000.0, world_center.y / 1000.0);
    }

    debug!(x = world_center.x, y = world_center.y, projected, "localized structures");

    Localization {
        centroid,
        world_center,
        offsets,
    }
}

/// Pad or truncate a derived column to `expected` rows.
///
/// Columns are built from the same structure list, so a mismatch is a
/// defect upstream; it is logged and repaired instead of failing the batch.
pub fn align_column<T: Clone>(name: &str, mut column: Vec<T>, expected: usize, fill: T) -> Vec<T> {
    if column.len() != expected {
        warn!(
            column = name,
            found = column.len(),
            expected,
            "feature column length mismatch, aligning"
        );
        column.resize(expected, fill);
    }
    column
}

/// Size padding for a missing area value, target units squared
const FILL_AREA: f64 = 100.0;

/// Build the 8-column feature table for `structures`.
pub fn build_feature_table(
    structures: &[Structure],
    localization: &Localization,
    config: &PipelineConfig,
) -> FeatureTable {
    let n = structures.len();
    let f = config.unit_factor;

    let heights = align_column(
        "height",
        structures.iter().map(|s| s.height * f).collect(),
        n,
        config.floor_height_target(),
    );
    let areas = align_column(
        "area",
        structures.iter().map(|s| (s.length * f) * (s.width * f)).collect(),
        n,
        FILL_AREA,
    );
    let offsets = align_column("offset", localization.offsets.clone(), n, PolarOffset::new(0.0, 0.0));
    let detailed = align_column(
        "detailed",
        structures.iter().map(Structure::is_detailed).collect(),
        n,
        false,
    );

    let rows = (0..n)
        .map(|i| FeatureRow {
            index: i,
            height: heights[i],
            area: areas[i],
            radius: offsets[i].radius,
            angle: offsets[i].angle,
            x_offset: offsets[i].dx,
            y_offset: offsets[i].dy,
            detailed: detailed[i],
        })
        .collect();

    FeatureTable {
        rows,
        world_center: localization.world_center,
    }
}
