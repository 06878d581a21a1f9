// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Down-sampling structures to the K most relevant.
//!
//! Every criterion assigns a score per feature-table row; rows are sorted
//! ascending (stable) and the last K are kept, so the result is in ascending
//! score order.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{SelectionConfig, MAX_SELECTION};
use crate::error::Error;
use crate::structure::FeatureTable;

/// How rows are scored for selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionCriterion {
    Height,
    Area,
    #[serde(rename = "Total Size", alias = "TotalSize")]
    TotalSize,
    /// Gaussian falloff from the centroid with a little jitter
    Centerness,
    /// Centerness weighted by total size
    Mix,
    Random,
}

impl SelectionCriterion {
    pub fn name(self) -> &'static str {
        match self {
            SelectionCriterion::Height => "Height",
            SelectionCriterion::Area => "Area",
            SelectionCriterion::TotalSize => "Total Size",
            SelectionCriterion::Centerness => "Centerness",
            SelectionCriterion::Mix => "Mix",
            SelectionCriterion::Random => "Random",
        }
    }
}

impl fmt::Display for SelectionCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionCriterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "height" => Ok(SelectionCriterion::Height),
            "area" => Ok(SelectionCriterion::Area),
            "totalsize" => Ok(SelectionCriterion::TotalSize),
            "centerness" => Ok(SelectionCriterion::Centerness),
            "mix" => Ok(SelectionCriterion::Mix),
            "random" => Ok(SelectionCriterion::Random),
            _ => Err(Error::UnknownOption {
                kind: "selection criterion",
                name: s.to_string(),
            }),
        }
    }
}

/// Selected rows and their scores, ascending by score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub indices: Vec<usize>,
    pub scores: Vec<f64>,
}

/// Linear-interpolated percentile, `p` in `[0, 100]`
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, upper: f64) -> f64 {
    if upper > 0.0 {
        rng.random_range(0.0..upper)
    } else {
        0.0
    }
}

/// Gaussian closeness to the centroid; sigma is the 75th-percentile distance
fn gaussian_centerness(table: &FeatureTable) -> Vec<f64> {
    let distances: Vec<f64> = table.rows.iter().map(|r| r.x_offset.hypot(r.y_offset)).collect();
    let mut sigma = percentile(&distances, 75.0);
    if sigma == 0.0 {
        sigma = 1.0;
    }
    distances
        .iter()
        .map(|d| (-(d * d) / (2.0 * sigma * sigma)).exp())
        .collect()
}

fn value_range(values: &[f64]) -> f64 {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if values.is_empty() {
        0.0
    } else {
        hi - lo
    }
}

/// Score every row of `table` under `criterion`.
pub fn selection_scores<R: Rng + ?Sized>(
    table: &FeatureTable,
    criterion: SelectionCriterion,
    rng: &mut R,
) -> Vec<f64> {
    match criterion {
        SelectionCriterion::Height => table.rows.iter().map(|r| r.height).collect(),
        SelectionCriterion::Area => table.rows.iter().map(|r| r.area).collect(),
        SelectionCriterion::TotalSize => table.rows.iter().map(|r| r.total_size()).collect(),
        SelectionCriterion::Centerness => {
            let gauss = gaussian_centerness(table);
            let range = value_range(&gauss);
            gauss.iter().map(|g| g + jitter(rng, 0.1 * range)).collect()
        }
        SelectionCriterion::Mix => {
            let gauss = gaussian_centerness(table);
            let range = value_range(&gauss);
            gauss
                .iter()
                .zip(&table.rows)
                .map(|(g, row)| (g + jitter(rng, 0.05 * range)) * row.total_size())
                .collect()
        }
        SelectionCriterion::Random => table.rows.iter().map(|_| rng.random::<f64>()).collect(),
    }
}

/// Pick up to `config.count` rows, never more than [`MAX_SELECTION`].
pub fn select_structures<R: Rng + ?Sized>(
    table: &FeatureTable,
    config: &SelectionConfig,
    rng: &mut R,
) -> Selection {
    let available = table.len();
    let k = config.count.min(available).min(MAX_SELECTION);
    if k != config.count {
        warn!(
            requested = config.count,
            available,
            limit = MAX_SELECTION,
            selected = k,
            "selection size limited"
        );
    }

    let scores = selection_scores(table, config.criterion, rng);
    let mut order: Vec<usize> = (0..available).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let indices: Vec<usize> = order[available - k..].to_vec();
    let selected_scores = indices.iter().map(|&i| scores[i]).collect();

    info!(criterion = %config.criterion, selected = k, available, "selected structures");

    Selection {
        indices,
        scores: selected_scores,
    }
}
