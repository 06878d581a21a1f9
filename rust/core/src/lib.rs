// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BuildGen Core
//!
//! Turns building footprints into objective feature entries for a flight
//! simulator terrain.
//!
//! ## Overview
//!
//! - **Footprints**: polygons with free-form tags are fitted to rectangles,
//!   classified, and given a height from whatever tags are available
//! - **Localization**: structures are expressed as offsets from their
//!   common centroid in target units
//! - **Selection**: the structure set is down-sampled by size, centerness or
//!   at random
//! - **Matching**: each structure gets the catalog model nearest to its
//!   dimensions, optionally pre-filtered from its tags
//! - **Placement**: synthetic layouts scatter sampled models inside a disk
//!   without overlaps
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use buildgen_core::{
//!     feature_table, footprints_from_geojson, generate_from_footprints, process_footprints,
//!     Catalog, GenerationConfig, ValuesTable,
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = GenerationConfig::default();
//! let records = footprints_from_geojson(&geojson_text)?;
//! let batch = process_footprints(&records, None, &config.pipeline)?;
//! let table = feature_table(&batch, &config.pipeline);
//!
//! let catalog = Catalog::from_json(&catalog_text)?;
//! let values = ValuesTable::from_json(&values_text)?;
//! let mut rng = StdRng::seed_from_u64(7);
//! let generation =
//!     generate_from_footprints(&batch.structures, &table, &catalog, &values, &config, &mut rng)?;
//! println!("{}", generation.render("1.0"));
//! ```

pub mod auto_select;
pub mod catalog;
pub mod config;
pub mod error;
pub mod footprint;
pub mod generate;
pub mod geojson_input;
pub mod height;
pub mod localizer;
pub mod matcher;
pub mod placement;
pub mod record;
pub mod selection;
pub mod structure;
pub mod tags;

pub use auto_select::{filter_terms, preselect};
pub use catalog::{Catalog, CatalogModel, LengthAxis, ValuesTable};
pub use config::{
    GenerationConfig, MatchConfig, PipelineConfig, PlacementConfig, RecordConfig, SelectionConfig,
    FEET_PER_METER, MAX_SELECTION,
};
pub use error::{Error, Result};
pub use footprint::{
    process_footprint, process_footprints, FootprintBatch, FootprintGeometry, FootprintRecord,
    SkipReason, SkippedFootprint,
};
pub use generate::{feature_table, generate_from_footprints, generate_random, Generation};
pub use geojson_input::footprints_from_geojson;
pub use height::{
    estimate_height, floor_height_for, parse_height_text, HeightEstimate, HeightInputs,
    HeightSource, HeightSourceCounts, DEFAULT_FLOOR_HEIGHT_M,
};
pub use localizer::{build_feature_table, localize, Localization, PolarOffset};
pub use matcher::{
    aligned_rotation, anchored_position, nearest_model, query_dimensions, MatchMode, ModelMatch,
    QueryDims,
};
pub use placement::{
    candidate_position, collision_score, place_features, sample_catalog, BoundingBox,
    CollisionCheck, Distribution, OccupiedBoxes, Placement, PlacementEngine, PlacementOutcome,
};
pub use record::{
    render_objective, sort_records, PlacementRecord, PresenceSpec, SortOrder, ValueSpec,
};
pub use selection::{select_structures, selection_scores, Selection, SelectionCriterion};
pub use structure::{FeatureRow, FeatureTable, Structure, FEATURE_COLUMNS};
pub use tags::{classify, display_name, Classification, TagValue, Tags};
