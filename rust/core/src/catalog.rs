// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Catalog of placeable models and the values table.
//!
//! The catalog is read-only. Queries use a small comma-separated language:
//!
//! * `All` or an empty string selects every model
//! * words match `FeatureName` case-insensitively by substring
//! * numbers match `Type`, or `ModelNumber` when the query contains `ModelNum`
//!   (words are then ignored)
//!
//! Query results come back in a shuffled order seeded by the result size, so
//! the same query over the same catalog always yields the same order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Which nominal model axis carries the model's length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub enum LengthAxis {
    /// Length along the model's own x axis (`LengthIdx = 0`)
    #[default]
    Along,
    /// Length along the model's y axis (`LengthIdx = 1`)
    Across,
}

impl TryFrom<f64> for LengthAxis {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, Self::Error> {
        if value == 0.0 {
            Ok(LengthAxis::Along)
        } else if value == 1.0 {
            Ok(LengthAxis::Across)
        } else {
            Err(format!("LengthIdx must be 0 or 1, got {value}"))
        }
    }
}

impl From<LengthAxis> for u8 {
    fn from(axis: LengthAxis) -> Self {
        match axis {
            LengthAxis::Along => 0,
            LengthAxis::Across => 1,
        }
    }
}

/// One placeable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogModel {
    #[serde(rename = "CTNumber")]
    pub ct_number: i64,
    #[serde(default)]
    pub model_number: Option<i64>,
    pub feature_name: String,
    #[serde(rename = "Type")]
    pub feature_type: i64,
    pub width: f64,
    pub length: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(rename = "LengthIdx", default)]
    pub length_axis: LengthAxis,
    #[serde(default)]
    pub width_off: f64,
    #[serde(default)]
    pub length_off: f64,
}

impl CatalogModel {
    /// Distance from the model origin to its geometric anchor
    pub fn anchor_offset(&self) -> f64 {
        self.length_off.hypot(self.width_off)
    }
}

/// Read-only list of models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    models: Vec<CatalogModel>,
}

impl Catalog {
    pub fn new(models: Vec<CatalogModel>) -> Self {
        Self { models }
    }

    /// Parse a JSON array of catalog rows
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[CatalogModel] {
        &self.models
    }

    pub fn get(&self, index: usize) -> Option<&CatalogModel> {
        self.models.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogModel> {
        self.models.iter()
    }

    /// Models matching `expr`, in reproducibly shuffled order.
    pub fn query(&self, expr: &str) -> Catalog {
        let items: Vec<&str> = expr.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        let everything = items.is_empty() || (items.len() == 1 && items[0].eq_ignore_ascii_case("all"));

        let mut models: Vec<CatalogModel> = if everything {
            self.models.clone()
        } else {
            let by_model_number = items.iter().any(|i| i.eq_ignore_ascii_case("modelnum"));
            let numbers: Vec<i64> = items.iter().filter_map(|i| i.parse().ok()).collect();
            // model-number queries match on numbers alone
            let words: Vec<String> = if by_model_number {
                Vec::new()
            } else {
                items
                    .iter()
                    .filter(|i| i.parse::<i64>().is_err())
                    .map(|i| i.to_lowercase())
                    .collect()
            };

            self.models
                .iter()
                .filter(|m| {
                    let number_hit = if by_model_number {
                        m.model_number.is_some_and(|n| numbers.contains(&n))
                    } else {
                        numbers.contains(&m.feature_type)
                    };
                    let name = m.feature_name.to_lowercase();
                    number_hit || words.iter().any(|w| name.contains(w.as_str()))
                })
                .cloned()
                .collect()
        };

        let mut rng = StdRng::seed_from_u64(models.len() as u64);
        models.shuffle(&mut rng);
        debug!(query = expr, rows = models.len(), "catalog query");
        Catalog { models }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogModel;
    type IntoIter = std::slice::Iter<'a, CatalogModel>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

/// Entry of the values table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueEntry {
    #[serde(rename = "Value")]
    pub value: f64,
}

/// Per-type default value, keyed by catalog `Type`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuesTable(FxHashMap<String, ValueEntry>);

impl ValuesTable {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn insert(&mut self, feature_type: i64, value: f64) {
        self.0.insert(feature_type.to_string(), ValueEntry { value });
    }

    pub fn value_for(&self, feature_type: i64) -> Result<f64> {
        self.0
            .get(&feature_type.to_string())
            .map(|entry| entry.value)
            .ok_or(Error::MissingValue(feature_type))
    }
}
