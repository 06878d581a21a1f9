// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunables for every stage of generation.
//!
//! Each struct has a `Default` with the stock values and deserializes with
//! `#[serde(default)]`, so a JSON document only needs the fields it changes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::height::DEFAULT_FLOOR_HEIGHT_M;
use crate::matcher::MatchMode;
use crate::placement::Distribution;
use crate::record::{PresenceSpec, SortOrder, ValueSpec};
use crate::selection::SelectionCriterion;

/// Footprint meters to simulator feet
pub const FEET_PER_METER: f64 = 3.27998;

/// Upper bound on structures per objective
pub const MAX_SELECTION: usize = 256;

/// Footprint processing and unit conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Footprint units to target units
    pub unit_factor: f64,
    /// Floor height for unknown building types, meters
    pub default_floor_height_m: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unit_factor: FEET_PER_METER,
            default_floor_height_m: DEFAULT_FLOOR_HEIGHT_M,
        }
    }
}

impl PipelineConfig {
    /// Default floor height in target units
    pub fn floor_height_target(&self) -> f64 {
        self.default_floor_height_m * self.unit_factor
    }
}

/// Structure down-sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub criterion: SelectionCriterion,
    /// Requested number of structures
    pub count: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            criterion: SelectionCriterion::TotalSize,
            count: MAX_SELECTION,
        }
    }
}

/// Catalog model matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub mode: MatchMode,
    /// Mean number of extra floors added to structure heights (volumetric mode)
    pub extra_floors: f64,
    /// Narrow the catalog per structure from its classification tags
    pub auto_select: bool,
    /// Catalog query applied before matching, `All` for everything
    pub catalog_filter: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Planar,
            extra_floors: 0.0,
            auto_select: false,
            catalog_filter: "All".to_string(),
        }
    }
}

/// Randomized collision-aware placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub distribution: Distribution,
    pub max_attempts: usize,
    /// First attempt of the second sampling phase
    pub second_phase: usize,
    /// First attempt of the fallback phase; the radius constraint is relaxed from here
    pub fallback_phase: usize,
    /// Smallest clearance added around a feature
    pub min_buffer: f64,
    /// Clearance as a fraction of the feature's larger dimension
    pub buffer_ratio: f64,
    /// Overlap areas below this are ignored
    pub negligible_overlap: f64,
    /// Overlap ratio that ends the scan early
    pub severe_overlap: f64,
    /// Proximity ratio above which two features collide
    pub proximity_slack: f64,
    /// Weight of the proximity ratio in the score
    pub proximity_weight: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            distribution: Distribution::Normal,
            max_attempts: 50,
            second_phase: 15,
            fallback_phase: 30,
            min_buffer: 5.0,
            buffer_ratio: 0.25,
            negligible_overlap: 0.01,
            severe_overlap: 0.5,
            proximity_slack: 0.2,
            proximity_weight: 0.5,
        }
    }
}

/// Placement record contents and ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    pub value: ValueSpec,
    pub presence: PresenceSpec,
    pub sort: SortOrder,
    pub generator_version: String,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            value: ValueSpec::Lookup,
            presence: PresenceSpec::Fixed(100.0),
            sort: SortOrder::None,
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Everything a generation run needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub pipeline: PipelineConfig,
    pub selection: SelectionConfig,
    pub matching: MatchConfig,
    pub placement: PlacementConfig,
    pub record: RecordConfig,
}

impl GenerationConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
