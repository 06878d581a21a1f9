// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement records and the objective file text.
//!
//! A record renders to one `FeatureEntry=` line:
//!
//! ```text
//! FeatureEntry=<ct> <y:.4> <x:.4> 0.0000 <rotation:.4> <value:04> 0000 -1 <presence># <index>) <name>
//! ```

use std::fmt;
use std::str::FromStr;

use buildgen_geometry::Point2D;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::ValuesTable;
use crate::error::{Error, Result};

const ENTRY_PREFIX: &str = "FeatureEntry=";

fn uniform<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    min + (max - min) * rng.random::<f64>()
}

/// Source of a record's value field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ValueSpec {
    /// Per-type entry from the values table
    #[default]
    Lookup,
    Fixed(f64),
    /// Uniform in `[min, max)`
    Range { min: f64, max: f64 },
}

impl ValueSpec {
    pub fn resolve<R: Rng + ?Sized>(&self, feature_type: i64, values: &ValuesTable, rng: &mut R) -> Result<f64> {
        match *self {
            ValueSpec::Range { min, max } => Ok(uniform(min, max, rng)),
            ValueSpec::Fixed(value) => Ok(value),
            ValueSpec::Lookup => values.value_for(feature_type),
        }
    }
}

/// Source of a record's presence field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PresenceSpec {
    Fixed(f64),
    Range { min: f64, max: f64 },
}

impl Default for PresenceSpec {
    fn default() -> Self {
        PresenceSpec::Fixed(100.0)
    }
}

impl PresenceSpec {
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            PresenceSpec::Fixed(presence) => presence,
            PresenceSpec::Range { min, max } => uniform(min, max, rng),
        }
    }
}

/// Output ordering of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Generation order
    #[default]
    None,
    /// Case-insensitive by name
    Alphabet,
    /// Highest value first, then by name
    Value,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(SortOrder::None),
            "alphabet" | "name" => Ok(SortOrder::Alphabet),
            "value" => Ok(SortOrder::Value),
            _ => Err(Error::UnknownOption {
                kind: "sort order",
                name: s.to_string(),
            }),
        }
    }
}

/// One placed model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub ct_number: i64,
    pub y: f64,
    pub x: f64,
    pub rotation: f64,
    pub value: i64,
    pub presence: i64,
    pub index: usize,
    pub name: String,
}

impl PlacementRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{ENTRY_PREFIX}{} {:.4} {:.4} 0.0000 {:.4} {:04} 0000 -1 {}# {}) {}",
            self.ct_number, self.y, self.x, self.rotation, self.value, self.presence, self.index, self.name
        )
    }

    /// Parse a line produced by [`PlacementRecord::to_line`].
    pub fn parse_line(line: &str) -> Result<Self> {
        let invalid = || Error::InvalidRecord(line.to_string());

        let body = line.trim_end().strip_prefix(ENTRY_PREFIX).ok_or_else(invalid)?;
        let (fields, label) = body.split_once('#').ok_or_else(invalid)?;
        let fields: Vec<&str> = fields.split_whitespace().collect();
        let &[ct, y, x, _z, rotation, value, _, _, presence] = fields.as_slice() else {
            return Err(invalid());
        };
        let (index, name) = label.trim_start().split_once(')').ok_or_else(invalid)?;

        let number = |text: &str| text.parse::<f64>().map_err(|_| invalid());
        let integer = |text: &str| text.parse::<i64>().map_err(|_| invalid());

        Ok(Self {
            ct_number: integer(ct)?,
            y: number(y)?,
            x: number(x)?,
            rotation: number(rotation)?,
            value: integer(value)?,
            presence: integer(presence)?,
            index: index.trim().parse().map_err(|_| invalid())?,
            name: name.strip_prefix(' ').unwrap_or(name).to_string(),
        })
    }
}

impl fmt::Display for PlacementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

impl FromStr for PlacementRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PlacementRecord::parse_line(s)
    }
}

/// Reorder records and renumber their indices from zero.
///
/// `SortOrder::None` leaves the records untouched.
pub fn sort_records(records: &mut [PlacementRecord], order: SortOrder) {
    match order {
        SortOrder::None => return,
        SortOrder::Alphabet => records.sort_by_cached_key(|r| r.name.to_lowercase()),
        SortOrder::Value => records.sort_by_cached_key(|r| (-r.value, r.name.to_lowercase())),
    }
    for (index, record) in records.iter_mut().enumerate() {
        record.index = index;
    }
}

/// Full objective file body for `records`.
pub fn render_objective(version: &str, world_center: Point2D, records: &[PlacementRecord]) -> String {
    let entries: Vec<String> = records.iter().map(PlacementRecord::to_line).collect();
    format!(
        "# BMS-BuildingGenerator v{version} for FalconEditor - Objective Data\n\n\
         # Objective original location in Falcon World (Falcon BMS 4.38 with New Terrain)\n\
         # ObjX: {:?} \n# ObjY: {:?}\n\n\
         Version=6\n\n\
         # FeatureEntries {}\n\n\
         {}\n\n# Point Headers 0\n",
        world_center.x,
        world_center.y,
        records.len(),
        entries.join("\n"),
    )
}
