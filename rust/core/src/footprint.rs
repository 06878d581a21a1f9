// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint pipeline: polygons with tags in, [`Structure`]s out.
//!
//! Records are independent, so they are fitted in parallel and collected in
//! input order. A record that cannot produce a structure is skipped with a
//! [`SkipReason`]; the batch only fails when nothing survives.

use buildgen_geometry::{fit_footprint, project_ring, Point2D, Projection};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::height::{estimate_height, HeightInputs, HeightSourceCounts};
use crate::structure::Structure;
use crate::tags::{classify, display_name, Tags};

/// Ring of a polygon, first ring is the outer boundary
pub type Ring = Vec<Point2D>;

/// Geometry of a footprint record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FootprintGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
    /// Any other geometry type, by name
    Unsupported(String),
}

impl FootprintGeometry {
    /// Outer rings in order; empty for unsupported geometry
    pub fn outer_rings(&self) -> Vec<&[Point2D]> {
        match self {
            FootprintGeometry::Polygon(rings) => rings.first().map(Vec::as_slice).into_iter().collect(),
            FootprintGeometry::MultiPolygon(polygons) => polygons
                .iter()
                .filter_map(|rings| rings.first().map(Vec::as_slice))
                .collect(),
            FootprintGeometry::Unsupported(_) => Vec::new(),
        }
    }
}

/// One input footprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintRecord {
    pub geometry: Option<FootprintGeometry>,
    pub tags: Tags,
}

impl FootprintRecord {
    pub fn polygon(ring: Ring, tags: Tags) -> Self {
        Self {
            geometry: Some(FootprintGeometry::Polygon(vec![ring])),
            tags,
        }
    }
}

/// Why a record did not become a structure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("geometry is null")]
    NullGeometry,

    #[error("unsupported geometry type {0}")]
    UnsupportedGeometry(String),

    #[error("outer ring has {0} usable points")]
    InsufficientPoints(usize),

    #[error(transparent)]
    Geometry(#[from] buildgen_geometry::Error),
}

/// A skipped record and the reason
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFootprint {
    pub record: usize,
    pub reason: SkipReason,
}

/// Outcome of processing a batch of footprints
#[derive(Debug, Clone, Default)]
pub struct FootprintBatch {
    pub structures: Vec<Structure>,
    pub skipped: Vec<SkippedFootprint>,
    pub height_sources: HeightSourceCounts,
    /// Whether a projection was applied to the vertices
    pub projected: bool,
}

impl FootprintBatch {
    pub fn centers(&self) -> Vec<Point2D> {
        self.structures.iter().map(|s| s.center).collect()
    }
}

/// Turn one record into a structure. `index` is left at 0 for the caller.
pub fn process_footprint(
    record: usize,
    footprint: &FootprintRecord,
    projection: Option<&dyn Projection>,
    config: &PipelineConfig,
) -> std::result::Result<Structure, SkipReason> {
    let geometry = footprint.geometry.as_ref().ok_or(SkipReason::NullGeometry)?;
    if let FootprintGeometry::Unsupported(kind) = geometry {
        return Err(SkipReason::UnsupportedGeometry(kind.clone()));
    }

    // First outer ring with enough usable points
    let mut best_count = 0;
    let mut ring = None;
    for outer in geometry.outer_rings() {
        let projected = project_ring(outer, projection);
        if projected.points.len() >= 3 {
            ring = Some(projected.points);
            break;
        }
        best_count = best_count.max(projected.points.len());
    }
    let ring = ring.ok_or(SkipReason::InsufficientPoints(best_count))?;

    let fitted = fit_footprint(&ring)?;
    let height = estimate_height(&HeightInputs::from_tags(&footprint.tags), config.default_floor_height_m);
    let classification = classify(&footprint.tags);

    debug!(
        record,
        length = fitted.length(),
        width = fitted.width(),
        rotation = fitted.rotation,
        height = height.meters,
        source = %height.provenance,
        "fitted footprint"
    );

    Ok(Structure {
        index: 0,
        record,
        center: fitted.center,
        rotation: fitted.rotation,
        length: fitted.length(),
        width: fitted.width(),
        height: height.meters,
        height_source: height.source,
        height_provenance: height.provenance,
        classification,
        name: display_name(&footprint.tags),
    })
}

/// Process a batch of footprint records in parallel.
///
/// Structures keep input order and are indexed 0..n. Fails with
/// [`Error::NoStructures`] when every record was skipped.
pub fn process_footprints(
    records: &[FootprintRecord],
    projection: Option<&dyn Projection>,
    config: &PipelineConfig,
) -> Result<FootprintBatch> {
    let results: Vec<_> = records
        .par_iter()
        .enumerate()
        .map(|(i, record)| (i, process_footprint(i, record, projection, config)))
        .collect();

    let mut batch = FootprintBatch {
        projected: projection.is_some(),
        ..Default::default()
    };

    for (record, result) in results {
        match result {
            Ok(mut structure) => {
                structure.index = batch.structures.len();
                batch.height_sources.record(structure.height_source);
                batch.structures.push(structure);
            }
            Err(reason) => {
                warn!(record, reason = %reason, "skipping footprint");
                batch.skipped.push(SkippedFootprint { record, reason });
            }
        }
    }

    if !batch.skipped.is_empty() {
        let sample: Vec<String> = batch
            .skipped
            .iter()
            .take(5)
            .map(|s| format!("#{}: {}", s.record, s.reason))
            .collect();
        warn!(skipped = batch.skipped.len(), first = ?sample, "some footprints were skipped");
    }

    if batch.structures.is_empty() {
        return Err(Error::NoStructures {
            skipped: batch.skipped.len(),
        });
    }

    log_height_summary(&batch);
    Ok(batch)
}

fn log_height_summary(batch: &FootprintBatch) {
    let heights = batch.structures.iter().map(|s| s.height);
    let (min, max, sum) = heights.fold((f64::INFINITY, f64::NEG_INFINITY, 0.0), |(lo, hi, sum), h| {
        (lo.min(h), hi.max(h), sum + h)
    });
    let mean = sum / batch.structures.len() as f64;

    let sources: Vec<String> = batch
        .height_sources
        .ranked()
        .into_iter()
        .map(|(source, count)| format!("{source}={count}"))
        .collect();

    info!(
        structures = batch.structures.len(),
        skipped = batch.skipped.len(),
        min_height = min,
        max_height = max,
        mean_height = mean,
        sources = %sources.join(", "),
        "processed footprints"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::height::HeightSource;
    use crate::tags::TagValue;
    use approx::assert_relative_eq;
    use buildgen_geometry::MapConversion;

    fn square(x0: f64, y0: f64, size: f64) -> Ring {
        vec![
            Point2D::new(x0, y0),
            Point2D::new(x0 + size, y0),
            Point2D::new(x0 + size, y0 + size),
            Point2D::new(x0, y0 + size),
            Point2D::new(x0, y0),
        ]
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), TagValue::String((*v).to_string())))
            .collect()
    }

    #[test]
    fn square_footprint_becomes_structure() {
        let record = FootprintRecord::polygon(square(0.0, 0.0, 10.0), tags(&[("height", "12m")]));
        let structure = process_footprint(0, &record, None, &PipelineConfig::default()).unwrap();
        assert_relative_eq!(structure.length, 10.0);
        assert_relative_eq!(structure.width, 10.0);
        assert_relative_eq!(structure.center.x, 5.0);
        assert_relative_eq!(structure.center.y, 5.0);
        assert_relative_eq!(structure.rotation, 270.0);
        assert_relative_eq!(structure.height, 12.0);
        assert_eq!(structure.height_source, HeightSource::Explicit);
        assert!(structure.height_provenance.contains("height=12.00m"));
    }

    #[test]
    fn skip_reasons() {
        let config = PipelineConfig::default();
        let null = FootprintRecord::default();
        assert_eq!(
            process_footprint(0, &null, None, &config).unwrap_err(),
            SkipReason::NullGeometry
        );

        let point = FootprintRecord {
            geometry: Some(FootprintGeometry::Unsupported("Point".into())),
            tags: Tags::default(),
        };
        assert_eq!(
            process_footprint(0, &point, None, &config).unwrap_err(),
            SkipReason::UnsupportedGeometry("Point".into())
        );

        let sliver = FootprintRecord::polygon(
            vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
            Tags::default(),
        );
        assert_eq!(
            process_footprint(0, &sliver, None, &config).unwrap_err(),
            SkipReason::InsufficientPoints(2)
        );

        let line = FootprintRecord::polygon(
            vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0), Point2D::new(2.0, 2.0)],
            Tags::default(),
        );
        assert!(matches!(
            process_footprint(0, &line, None, &config).unwrap_err(),
            SkipReason::Geometry(_)
        ));
    }

    #[test]
    fn multipolygon_uses_first_usable_outer_ring() {
        let record = FootprintRecord {
            geometry: Some(FootprintGeometry::MultiPolygon(vec![
                vec![vec![Point2D::new(0.0, 0.0)]],
                vec![square(100.0, 100.0, 4.0)],
                vec![square(0.0, 0.0, 50.0)],
            ])),
            tags: Tags::default(),
        };
        let structure = process_footprint(3, &record, None, &PipelineConfig::default()).unwrap();
        assert_relative_eq!(structure.center.x, 102.0);
        assert_relative_eq!(structure.length, 4.0);
        assert_eq!(structure.record, 3);
    }

    #[test]
    fn projection_is_applied_before_fitting() {
        let conv = MapConversion::new(1000.0, 2000.0, 0.0, 2.0);
        let record = FootprintRecord::polygon(square(0.0, 0.0, 10.0), Tags::default());
        let structure = process_footprint(0, &record, Some(&conv as &dyn Projection), &PipelineConfig::default()).unwrap();
        assert_relative_eq!(structure.center.x, 1010.0);
        assert_relative_eq!(structure.center.y, 2010.0);
        assert_relative_eq!(structure.length, 20.0);
    }

    #[test]
    fn batch_skips_bad_records_and_keeps_order() {
        let records = vec![
            FootprintRecord::polygon(square(0.0, 0.0, 10.0), tags(&[("building", "office"), ("building:levels", "3")])),
            FootprintRecord::default(),
            FootprintRecord::polygon(square(50.0, 0.0, 6.0), tags(&[("name", "Depot")])),
        ];
        let batch = process_footprints(&records, None, &PipelineConfig::default()).unwrap();
        assert_eq!(batch.structures.len(), 2);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].record, 1);
        assert_eq!(batch.structures[0].index, 0);
        assert_eq!(batch.structures[1].index, 1);
        assert_eq!(batch.structures[1].record, 2);
        assert_eq!(batch.structures[1].name.as_deref(), Some("Depot"));
        assert_relative_eq!(batch.structures[0].height, 10.5);
        assert_eq!(batch.height_sources.get(HeightSource::Levels), 1);
        assert_eq!(batch.height_sources.get(HeightSource::Default), 1);
        assert!(!batch.projected);
    }

    #[test]
    fn empty_batch_fails() {
        let records = vec![FootprintRecord::default(), FootprintRecord::default()];
        match process_footprints(&records, None, &PipelineConfig::default()) {
            Err(Error::NoStructures { skipped }) => assert_eq!(skipped, 2),
            other => panic!("expected NoStructures, got {other:?}"),
        }
    }
}
