// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The two generation paths.
//!
//! * footprints: select structures, match each to its nearest catalog model
//!   and place it at the structure's offset from the centroid
//! * random: sample the catalog and scatter the models around the origin

use buildgen_geometry::Point2D;
use rand::Rng;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::auto_select::preselect;
use crate::catalog::{Catalog, CatalogModel, ValuesTable};
use crate::config::{GenerationConfig, PipelineConfig, RecordConfig};
use crate::error::{Error, Result};
use crate::footprint::FootprintBatch;
use crate::localizer::{build_feature_table, localize};
use crate::matcher::{aligned_rotation, anchored_position, nearest_model, query_dimensions};
use crate::placement::{place_features, sample_catalog};
use crate::record::{render_objective, sort_records, PlacementRecord};
use crate::selection::select_structures;
use crate::structure::{FeatureTable, Structure};

/// Records produced by one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub records: Vec<PlacementRecord>,
    /// Catalog `Type` → number of records using it
    pub feature_types: FxHashMap<i64, usize>,
    /// Objective location written into the file header
    pub world_center: Point2D,
}

impl Generation {
    fn push(&mut self, record: PlacementRecord, feature_type: i64) {
        *self.feature_types.entry(feature_type).or_default() += 1;
        self.records.push(record);
    }

    /// Objective file text for these records
    pub fn render(&self, version: &str) -> String {
        render_objective(version, self.world_center, &self.records)
    }
}

/// Localize a processed batch and build its feature table.
pub fn feature_table(batch: &FootprintBatch, config: &PipelineConfig) -> FeatureTable {
    let localization = localize(&batch.centers(), config.unit_factor, batch.projected);
    build_feature_table(&batch.structures, &localization, config)
}

fn filtered_catalog(catalog: &Catalog, filter: &str) -> Result<Catalog> {
    let filtered = catalog.query(filter);
    if filtered.is_empty() {
        warn!(filter, models = catalog.len(), "catalog filter matched nothing");
        return Err(Error::EmptyCatalog);
    }
    Ok(filtered)
}

fn build_record<R: Rng + ?Sized>(
    model: &CatalogModel,
    (x, y): (f64, f64),
    rotation: f64,
    index: usize,
    config: &RecordConfig,
    values: &ValuesTable,
    rng: &mut R,
) -> Result<PlacementRecord> {
    let value = config.value.resolve(model.feature_type, values, rng)?;
    let presence = config.presence.resolve(rng);
    Ok(PlacementRecord {
        ct_number: model.ct_number,
        y,
        x,
        rotation,
        value: value as i64,
        presence: presence as i64,
        index,
        name: model.feature_name.clone(),
    })
}

/// Match the selected structures against the catalog.
///
/// `structures` and `table` must come from the same batch. With
/// `auto_select` enabled each structure is matched against its tag-narrowed
/// slice of the full catalog when one exists, otherwise against the filtered
/// catalog.
pub fn generate_from_footprints<R: Rng + ?Sized>(
    structures: &[Structure],
    table: &FeatureTable,
    catalog: &Catalog,
    values: &ValuesTable,
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<Generation> {
    if structures.len() != table.len() {
        return Err(Error::Validation(format!(
            "{} structures but {} feature rows",
            structures.len(),
            table.len()
        )));
    }
    let models = filtered_catalog(catalog, &config.matching.catalog_filter)?;
    let selection = select_structures(table, &config.selection, rng);

    let mut generation = Generation {
        world_center: table.world_center,
        ..Default::default()
    };
    let mut narrowed = 0usize;

    for (index, &row_index) in selection.indices.iter().enumerate() {
        let structure = &structures[row_index];
        let row = &table.rows[row_index];

        let preselected = if config.matching.auto_select {
            preselect(catalog, &structure.classification)
        } else {
            None
        };
        if preselected.is_some() {
            narrowed += 1;
        }
        let candidates = preselected.as_ref().unwrap_or(&models);

        let query = query_dimensions(structure, &config.pipeline, &config.matching, rng);
        let found = nearest_model(&query, candidates.models(), config.matching.mode)?;
        let model = candidates.get(found.index).ok_or(Error::EmptyCatalog)?;

        let rotation = aligned_rotation(structure.rotation, model.length_axis);
        let position = anchored_position(row.x_offset, row.y_offset, rotation, model);
        debug!(
            structure = structure.index,
            ct = model.ct_number,
            model = %model.feature_name,
            distance = found.distance,
            "matched structure"
        );

        let record = build_record(model, position, rotation, index, &config.record, values, rng)?;
        generation.push(record, model.feature_type);
    }

    sort_records(&mut generation.records, config.record.sort);
    info!(
        records = generation.records.len(),
        auto_selected = narrowed,
        types = generation.feature_types.len(),
        "generated records from footprints"
    );
    Ok(generation)
}

/// Scatter `count` sampled catalog models inside a disk of `radius`.
pub fn generate_random<R: Rng + ?Sized>(
    catalog: &Catalog,
    values: &ValuesTable,
    count: usize,
    radius: f64,
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<Generation> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(Error::Validation(format!("placement radius must be positive, got {radius}")));
    }
    let models = filtered_catalog(catalog, &config.matching.catalog_filter)?;
    let sampled = sample_catalog(&models, count, rng)?;
    let placements = place_features(&sampled, radius, &config.placement, rng);

    let mut generation = Generation::default();
    for (index, (model, placement)) in sampled.iter().zip(&placements).enumerate() {
        let rotation = rng.random_range(0.0..360.0);
        let record = build_record(
            model,
            (placement.x, placement.y),
            rotation,
            index,
            &config.record,
            values,
            rng,
        )?;
        generation.push(record, model.feature_type);
    }

    sort_records(&mut generation.records, config.record.sort);
    info!(
        records = generation.records.len(),
        types = generation.feature_types.len(),
        "generated random records"
    );
    Ok(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LengthAxis;
    use crate::footprint::{process_footprints, FootprintRecord};
    use crate::record::{SortOrder, ValueSpec};
    use crate::tags::{TagValue, Tags};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model(ct: i64, name: &str, feature_type: i64, width: f64, length: f64) -> CatalogModel {
        CatalogModel {
            ct_number: ct,
            model_number: None,
            feature_name: name.to_string(),
            feature_type,
            width,
            length,
            height: 10.0,
            length_axis: LengthAxis::Along,
            width_off: 0.0,
            length_off: 0.0,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            model(1, "Small Shed", 3, 20.0, 20.0),
            model(2, "Warehouse", 12, 33.0, 66.0),
            model(3, "Hangar", 12, 100.0, 100.0),
        ])
    }

    fn values() -> ValuesTable {
        let mut v = ValuesTable::default();
        v.insert(3, 10.0);
        v.insert(12, 250.0);
        v
    }

    fn rect(x: f64, y: f64, w: f64, h: f64, tags: &[(&str, &str)]) -> FootprintRecord {
        let tags: Tags = tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), TagValue::String((*v).to_string())))
            .collect();
        FootprintRecord::polygon(
            vec![
                Point2D::new(x, y),
                Point2D::new(x + w, y),
                Point2D::new(x + w, y + h),
                Point2D::new(x, y + h),
            ],
            tags,
        )
    }

    fn batch() -> FootprintBatch {
        let records = vec![
            rect(0.0, 0.0, 6.0, 6.0, &[]),
            rect(100.0, 0.0, 10.0, 20.0, &[("building", "warehouse")]),
            rect(0.0, 100.0, 30.0, 30.0, &[]),
        ];
        process_footprints(&records, None, &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn footprints_match_nearest_models() {
        let batch = batch();
        let config = GenerationConfig::default();
        let table = feature_table(&batch, &config.pipeline);
        let mut rng = StdRng::seed_from_u64(1);
        let generation =
            generate_from_footprints(&batch.structures, &table, &catalog(), &values(), &config, &mut rng).unwrap();

        assert_eq!(generation.records.len(), 3);
        // ascending total size: shed-sized, warehouse-sized, hangar-sized
        let cts: Vec<i64> = generation.records.iter().map(|r| r.ct_number).collect();
        assert_eq!(cts, vec![1, 2, 3]);
        assert_eq!(generation.feature_types[&12], 2);
        assert_eq!(generation.feature_types[&3], 1);
        assert_eq!(generation.records[1].value, 250);
        assert_eq!(generation.records[1].presence, 100);

        let row = &table.rows[1];
        assert_relative_eq!(generation.records[1].x, row.x_offset);
        assert_relative_eq!(generation.records[1].y, row.y_offset);
        assert_eq!(generation.world_center, table.world_center);
    }

    #[test]
    fn across_models_turn_by_ninety_degrees() {
        let batch = batch();
        let config = GenerationConfig::default();
        let table = feature_table(&batch, &config.pipeline);
        let mut models = catalog().models().to_vec();
        for m in &mut models {
            m.length_axis = LengthAxis::Across;
        }
        let mut rng = StdRng::seed_from_u64(1);
        let generation =
            generate_from_footprints(&batch.structures, &table, &Catalog::new(models), &values(), &config, &mut rng)
                .unwrap();
        for record in &generation.records {
            let structure = batch
                .structures
                .iter()
                .find(|s| (aligned_rotation(s.rotation, LengthAxis::Across) - record.rotation).abs() < 1e-9);
            assert!(structure.is_some());
        }
    }

    #[test]
    fn auto_select_narrows_candidates() {
        let batch = batch();
        let mut config = GenerationConfig::default();
        config.matching.auto_select = true;
        config.record.value = ValueSpec::Fixed(1.0);
        let table = feature_table(&batch, &config.pipeline);
        let catalog = Catalog::new(vec![model(1, "Small Shed", 3, 20.0, 20.0), model(9, "warehouse", 12, 500.0, 500.0)]);
        let mut rng = StdRng::seed_from_u64(2);
        let generation =
            generate_from_footprints(&batch.structures, &table, &catalog, &values(), &config, &mut rng).unwrap();
        let cts: Vec<i64> = generation.records.iter().map(|r| r.ct_number).collect();
        // only the tagged warehouse is forced onto the large model
        assert_eq!(cts.iter().filter(|&&ct| ct == 9).count(), 1);
    }

    #[test]
    fn sorted_output_is_renumbered() {
        let batch = batch();
        let mut config = GenerationConfig::default();
        config.record.sort = SortOrder::Alphabet;
        let table = feature_table(&batch, &config.pipeline);
        let mut rng = StdRng::seed_from_u64(3);
        let generation =
            generate_from_footprints(&batch.structures, &table, &catalog(), &values(), &config, &mut rng).unwrap();
        let names: Vec<&str> = generation.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Hangar", "Small Shed", "Warehouse"]);
        let indices: Vec<usize> = generation.records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn missing_value_entry_fails() {
        let batch = batch();
        let config = GenerationConfig::default();
        let table = feature_table(&batch, &config.pipeline);
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate_from_footprints(&batch.structures, &table, &catalog(), &ValuesTable::default(), &config, &mut rng);
        assert!(matches!(result, Err(Error::MissingValue(_))));
    }

    #[test]
    fn empty_filter_result_is_an_error() {
        let batch = batch();
        let mut config = GenerationConfig::default();
        config.matching.catalog_filter = "submarine".to_string();
        let table = feature_table(&batch, &config.pipeline);
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate_from_footprints(&batch.structures, &table, &catalog(), &values(), &config, &mut rng);
        assert!(matches!(result, Err(Error::EmptyCatalog)));
    }

    #[test]
    fn random_generation_is_seeded() {
        let config = GenerationConfig::default();
        let run = |seed| {
            generate_random(&catalog(), &values(), 8, 1000.0, &config, &mut StdRng::seed_from_u64(seed)).unwrap()
        };
        let a = run(10);
        assert_eq!(a.records.len(), 8);
        assert_eq!(a, run(10));
        assert_eq!(a.feature_types.values().sum::<usize>(), 8);
        for record in &a.records {
            assert!((0.0..360.0).contains(&record.rotation));
        }
    }

    #[test]
    fn random_generation_rejects_bad_radius() {
        let config = GenerationConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            generate_random(&catalog(), &values(), 1, 0.0, &config, &mut rng),
            Err(Error::Validation(_))
        ));
    }
}
