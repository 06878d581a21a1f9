// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nearest catalog model by physical dimensions.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogModel, LengthAxis};
use crate::config::{MatchConfig, PipelineConfig};
use crate::error::{Error, Result};
use crate::structure::Structure;

/// Which dimensions take part in the distance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    /// Width and length
    #[default]
    #[serde(rename = "2D", alias = "Planar")]
    Planar,
    /// Width, length and height
    #[serde(rename = "3D", alias = "Volumetric")]
    Volumetric,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchMode::Planar => "2D",
            MatchMode::Volumetric => "3D",
        })
    }
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2d" | "planar" => Ok(MatchMode::Planar),
            "3d" | "volumetric" => Ok(MatchMode::Volumetric),
            _ => Err(Error::UnknownOption {
                kind: "match mode",
                name: s.to_string(),
            }),
        }
    }
}

/// Structure dimensions in target units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryDims {
    pub width: f64,
    pub length: f64,
    pub height: f64,
}

impl QueryDims {
    fn distance_to(&self, model: &CatalogModel, mode: MatchMode) -> f64 {
        let dw = self.width - model.width;
        let dl = self.length - model.length;
        match mode {
            MatchMode::Planar => dw.hypot(dl),
            MatchMode::Volumetric => {
                let dh = self.height - model.height;
                (dw * dw + dl * dl + dh * dh).sqrt()
            }
        }
    }
}

/// Build the query for `structure`.
///
/// In volumetric mode with `extra_floors > 0` the height grows by
/// `max(0, N(extra_floors, extra_floors / 2))` floors of the default floor
/// height.
pub fn query_dimensions<R: Rng + ?Sized>(
    structure: &Structure,
    pipeline: &PipelineConfig,
    matching: &MatchConfig,
    rng: &mut R,
) -> QueryDims {
    let factor = pipeline.unit_factor;
    let mut height = structure.height * factor;

    if matching.mode == MatchMode::Volumetric && matching.extra_floors > 0.0 {
        let floors = Normal::new(matching.extra_floors, matching.extra_floors / 2.0)
            .map(|dist| rng.sample::<f64, _>(dist).max(0.0))
            .unwrap_or(matching.extra_floors);
        height += floors * pipeline.floor_height_target();
    }

    QueryDims {
        width: structure.width * factor,
        length: structure.length * factor,
        height,
    }
}

/// Chosen candidate and its distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelMatch {
    /// Position in the candidate slice
    pub index: usize,
    pub distance: f64,
}

/// First candidate with the smallest Euclidean distance to `query`.
pub fn nearest_model(query: &QueryDims, candidates: &[CatalogModel], mode: MatchMode) -> Result<ModelMatch> {
    let mut best: Option<ModelMatch> = None;
    for (index, model) in candidates.iter().enumerate() {
        let distance = query.distance_to(model, mode);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(ModelMatch { index, distance });
        }
    }

    let found = best.ok_or(Error::EmptyCatalog)?;
    debug!(
        index = found.index,
        distance = found.distance,
        candidates = candidates.len(),
        "nearest model"
    );
    Ok(found)
}

/// Rotation of a model whose length runs along `axis`
pub fn aligned_rotation(rotation: f64, axis: LengthAxis) -> f64 {
    match axis {
        LengthAxis::Along => rotation,
        LengthAxis::Across => (rotation + 90.0).rem_euclid(360.0),
    }
}

/// Shift a placement so the model's anchor lands on `(x, y)`.
pub fn anchored_position(x: f64, y: f64, rotation: f64, model: &CatalogModel) -> (f64, f64) {
    let r = model.anchor_offset();
    let rad = rotation.to_radians();
    (x - r * rad.sin(), y - r * rad.cos())
}
