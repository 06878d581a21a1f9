// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reading footprint records from GeoJSON text.

use buildgen_geometry::Point2D;
use geojson::{Feature, GeoJson, Geometry, Value};
use tracing::debug;

use crate::error::Result;
use crate::footprint::{FootprintGeometry, FootprintRecord, Ring};
use crate::tags::{TagValue, Tags};

fn ring(positions: &[Vec<f64>]) -> Ring {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Point2D::new(p[0], p[1]))
        .collect()
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Vec<Ring> {
    rings.iter().map(|r| ring(r)).collect()
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn convert_geometry(geometry: &Geometry) -> FootprintGeometry {
    match &geometry.value {
        Value::Polygon(rings) => FootprintGeometry::Polygon(polygon(rings)),
        Value::MultiPolygon(polygons) => {
            FootprintGeometry::MultiPolygon(polygons.iter().map(|p| polygon(p)).collect())
        }
        other => FootprintGeometry::Unsupported(geometry_kind(other).to_string()),
    }
}

fn convert_feature(feature: &Feature) -> FootprintRecord {
    let tags: Tags = feature
        .properties
        .iter()
        .flatten()
        .map(|(key, value)| (key.clone(), TagValue::from(value)))
        .collect();
    FootprintRecord {
        geometry: feature.geometry.as_ref().map(convert_geometry),
        tags,
    }
}

/// Footprint records from a FeatureCollection, a single Feature or a bare
/// geometry.
///
/// Properties become tags; nested arrays and objects keep their JSON text.
/// Geometry types other than polygons are kept as unsupported so the
/// pipeline can report them.
pub fn footprints_from_geojson(text: &str) -> Result<Vec<FootprintRecord>> {
    let records: Vec<FootprintRecord> = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features.iter().map(convert_feature).collect(),
        GeoJson::Feature(feature) => vec![convert_feature(&feature)],
        GeoJson::Geometry(geometry) => vec![FootprintRecord {
            geometry: Some(convert_geometry(&geometry)),
            tags: Tags::default(),
        }],
    };
    debug!(records = records.len(), "read geojson footprints");
    Ok(records)
}
