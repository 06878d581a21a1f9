// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use buildgen_core::{
    feature_table, footprints_from_geojson, generate_from_footprints, generate_random,
    process_footprints, Catalog, GenerationConfig, HeightSource, PlacementRecord, SelectionCriterion,
    ValuesTable,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const FOOTPRINTS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"building": "yes"},
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]}
        },
        {
            "type": "Feature",
            "properties": {"building": "yes", "height": "12m", "name": "Tower Block"},
            "geometry": {"type": "Polygon", "coordinates": [[[40, 0], [60, 0], [60, 8], [40, 8], [40, 0]]]}
        },
        {
            "type": "Feature",
            "properties": {"building": "office", "building:levels": "3"},
            "geometry": {"type": "Polygon", "coordinates": [[[0, 40], [15, 40], [15, 70], [0, 70], [0, 40]]]}
        },
        {
            "type": "Feature",
            "properties": {"building": "yes"},
            "geometry": {"type": "Polygon", "coordinates": [[[5, 5], [6, 6]]]}
        },
        {
            "type": "Feature",
            "properties": {"highway": "service"},
            "geometry": {"type": "LineString", "coordinates": [[0, 0], [5, 5]]}
        }
    ]
}"#;

const CATALOG: &str = r#"[
    {"CTNumber": 10, "FeatureName": "Shed", "Type": 3, "Width": 30, "Length": 30, "Height": 8, "LengthIdx": 0},
    {"CTNumber": 11, "FeatureName": "Apartment", "Type": 5, "Width": 26, "Length": 66, "Height": 40, "LengthIdx": 1, "WidthOff": 3, "LengthOff": 4},
    {"CTNumber": 12, "FeatureName": "Office", "Type": 5, "Width": 50, "Length": 100, "Height": 35, "LengthIdx": 0}
]"#;

const VALUES: &str = r#"{"3": {"Value": 5}, "5": {"Value": 120}}"#;

#[test]
fn square_footprint_end_to_end() {
    let records = footprints_from_geojson(FOOTPRINTS).unwrap();
    assert_eq!(records.len(), 5);

    let config = GenerationConfig::default();
    let batch = process_footprints(&records, None, &config.pipeline).unwrap();
    assert_eq!(batch.structures.len(), 3);
    assert_eq!(batch.skipped.len(), 2);

    let square = &batch.structures[0];
    assert_relative_eq!(square.length, 10.0, epsilon = 1e-9);
    assert_relative_eq!(square.width, 10.0, epsilon = 1e-9);
    assert_relative_eq!(square.rotation, 270.0, epsilon = 1e-9);
    assert_relative_eq!(square.center.x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(square.center.y, 5.0, epsilon = 1e-9);
    assert!(!square.is_detailed());
}

#[test]
fn heights_follow_tag_priority() {
    let records = footprints_from_geojson(FOOTPRINTS).unwrap();
    let config = GenerationConfig::default();
    let batch = process_footprints(&records, None, &config.pipeline).unwrap();

    let tower = &batch.structures[1];
    assert_relative_eq!(tower.height, 12.0);
    assert_eq!(tower.height_source, HeightSource::Explicit);
    assert!(tower.height_provenance.contains("height=12.00m"));
    assert_eq!(tower.name.as_deref(), Some("Tower Block"));

    let office = &batch.structures[2];
    assert_relative_eq!(office.height, 10.5);
    assert_eq!(office.height_source, HeightSource::Levels);
    assert!(office.is_detailed());

    assert_eq!(batch.height_sources.total(), 3);
    assert_eq!(batch.height_sources.get(HeightSource::Default), 1);
}

#[test]
fn feature_table_is_aligned_with_structures() {
    let records = footprints_from_geojson(FOOTPRINTS).unwrap();
    let config = GenerationConfig::default();
    let batch = process_footprints(&records, None, &config.pipeline).unwrap();
    let table = feature_table(&batch, &config.pipeline);

    assert_eq!(table.len(), batch.structures.len());
    let f = config.pipeline.unit_factor;
    for (row, structure) in table.rows.iter().zip(&batch.structures) {
        assert_relative_eq!(row.height, structure.height * f, epsilon = 1e-9);
        assert_relative_eq!(row.area, structure.footprint_area() * f * f, epsilon = 1e-6);
        assert!((0.0..360.0).contains(&row.angle));
        assert_relative_eq!(row.radius, row.x_offset.hypot(row.y_offset), epsilon = 1e-9);
    }
    let sum_x: f64 = table.rows.iter().map(|r| r.x_offset).sum();
    assert_relative_eq!(sum_x, 0.0, epsilon = 1e-9);
}

#[test]
fn seeded_generation_is_reproducible() {
    let records = footprints_from_geojson(FOOTPRINTS).unwrap();
    let catalog = Catalog::from_json(CATALOG).unwrap();
    let values = ValuesTable::from_json(VALUES).unwrap();

    let mut config = GenerationConfig::default();
    config.selection.criterion = SelectionCriterion::Centerness;
    config.selection.count = 2;

    let batch = process_footprints(&records, None, &config.pipeline).unwrap();
    let table = feature_table(&batch, &config.pipeline);
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_from_footprints(&batch.structures, &table, &catalog, &values, &config, &mut rng).unwrap()
    };

    let first = run(99);
    assert_eq!(first.records.len(), 2);
    assert_eq!(first, run(99));
    assert_eq!(first.render("0.4.2"), run(99).render("0.4.2"));
}

#[test]
fn generated_lines_parse_back() {
    let catalog = Catalog::from_json(CATALOG).unwrap();
    let values = ValuesTable::from_json(VALUES).unwrap();
    let config = GenerationConfig::default();
    let mut rng = StdRng::seed_from_u64(5);
    let generation = generate_random(&catalog, &values, 12, 800.0, &config, &mut rng).unwrap();

    let text = generation.render("0.4.2");
    assert!(text.contains("# FeatureEntries 12\n"));
    let lines: Vec<&str> = text.lines().filter(|l| l.starts_with("FeatureEntry=")).collect();
    assert_eq!(lines.len(), 12);

    for (line, record) in lines.iter().zip(&generation.records) {
        let parsed: PlacementRecord = line.parse().unwrap();
        assert_eq!(parsed.ct_number, record.ct_number);
        assert_relative_eq!(parsed.x, record.x, epsilon = 5e-5);
        assert_relative_eq!(parsed.y, record.y, epsilon = 5e-5);
        assert_relative_eq!(parsed.rotation, record.rotation, epsilon = 5e-5);
        assert_eq!(parsed.value, record.value);
        assert_eq!(parsed.name, record.name);
    }
}
