// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building height estimation from partial tag data.
//!
//! Sources are tried in a fixed order and the first usable one wins:
//! explicit height, estimated height, level counts, roof height, and finally
//! one floor of the building type. The chain always produces a height and a
//! provenance string describing where it came from.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::tags::{first_value, TagValue, Tags};

/// Floor height used when the building type is unknown, meters
pub const DEFAULT_FLOOR_HEIGHT_M: f64 = 2.286;

const FEET_TO_METERS: f64 = 0.3048;

/// Typical floor-to-floor height per `building=*` value, meters.
/// `yes` and unlisted types use the configured default.
pub const FLOOR_HEIGHTS: &[(&str, f64)] = &[
    ("office", 3.5),
    ("commercial", 4.0),
    ("retail", 4.0),
    ("warehouse", 6.0),
    ("industrial", 5.0),
    ("hospital", 3.8),
    ("school", 3.2),
    ("church", 6.0),
    ("cathedral", 8.0),
    ("temple", 5.0),
    ("mosque", 5.0),
    ("synagogue", 5.0),
    ("hotel", 3.0),
    ("residential", 2.7),
    ("apartments", 2.7),
    ("house", 2.5),
    ("detached", 2.5),
    ("terraced", 2.5),
    ("semi-detached", 2.5),
    ("bungalow", 2.3),
    ("garage", 2.5),
    ("shed", 2.2),
    ("barn", 4.0),
    ("greenhouse", 3.0),
    ("hangar", 8.0),
    ("stadium", 10.0),
    ("sports_hall", 8.0),
    ("train_station", 6.0),
    ("tower", 3.0),
];

/// Tag aliases read for each height input.
pub mod keys {
    pub const HEIGHT: &[&str] = &["height", "building:height"];
    pub const EST_HEIGHT: &[&str] = &["est_height"];
    pub const LEVELS: &[&str] = &["building:levels", "levels"];
    pub const ROOF_LEVELS: &[&str] = &["roof:levels"];
    pub const MIN_HEIGHT: &[&str] = &["min_height", "building:min_height"];
    pub const MIN_LEVEL: &[&str] = &["building:min_level", "min_level"];
    pub const ROOF_HEIGHT: &[&str] = &["roof:height", "building:roof:height"];
    pub const UNDERGROUND_LEVELS: &[&str] = &["building:levels:underground"];
    pub const BUILDING: &[&str] = &["building"];
}

/// Floor height for a building type.
pub fn floor_height_for(building_type: Option<&str>, default: f64) -> f64 {
    building_type
        .and_then(|t| FLOOR_HEIGHTS.iter().find(|(name, _)| *name == t))
        .map_or(default, |(_, h)| *h)
}

const NOT_A_HEIGHT: &[&str] = &["", "none", "null", "n/a", "unknown", "true", "false"];

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

fn strip_any_suffix<'a>(text: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix))
        .map(str::trim_end)
}

/// Parse a height written in meters or feet into meters.
///
/// Accepts `12`, `12.5`, `12m`, `12 meters`, `40 ft`, `40 feet` and
/// `12'6"`. Placeholders and non-positive values give `None`.
pub fn parse_height_text(text: &str) -> Option<f64> {
    let t = text.trim().to_lowercase();
    if NOT_A_HEIGHT.contains(&t.as_str()) {
        return None;
    }

    if let Some((feet, inches)) = t.split_once('\'') {
        let feet: f64 = feet.trim().parse().ok()?;
        let inches = inches.trim().trim_end_matches('"').trim();
        let inches: f64 = if inches.is_empty() { 0.0 } else { inches.parse().ok()? };
        return positive((feet + inches / 12.0) * FEET_TO_METERS);
    }

    if let Some(number) = strip_any_suffix(&t, &["feet", "foot", "ft"]) {
        return positive(number.parse::<f64>().ok()? * FEET_TO_METERS);
    }

    let number = strip_any_suffix(&t, &["meters", "metres", "meter", "metre", "m"]).unwrap_or(t.as_str());
    positive(number.parse().ok()?)
}

/// Parse a tag value as a height in meters (or a level count).
pub fn parse_height_value(value: &TagValue) -> Option<f64> {
    match value {
        TagValue::Number(n) => positive(*n),
        TagValue::String(s) => parse_height_text(s),
        TagValue::Null | TagValue::Bool(_) => None,
    }
}

/// Height-relevant facts read from a footprint's tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeightInputs {
    pub height: Option<f64>,
    pub est_height: Option<f64>,
    pub building_levels: Option<f64>,
    pub roof_levels: Option<f64>,
    pub min_height: Option<f64>,
    pub min_level: Option<f64>,
    pub roof_height: Option<f64>,
    /// Carried for reporting; floors below ground add no visible height
    pub underground_levels: Option<f64>,
    pub building_type: Option<String>,
}

impl HeightInputs {
    pub fn from_tags(tags: &Tags) -> Self {
        let number = |aliases: &[&str]| first_value(tags, aliases).as_ref().and_then(parse_height_value);
        Self {
            height: number(keys::HEIGHT),
            est_height: number(keys::EST_HEIGHT),
            building_levels: number(keys::LEVELS),
            roof_levels: number(keys::ROOF_LEVELS),
            min_height: number(keys::MIN_HEIGHT),
            min_level: number(keys::MIN_LEVEL),
            roof_height: number(keys::ROOF_HEIGHT),
            underground_levels: number(keys::UNDERGROUND_LEVELS),
            building_type: first_value(tags, keys::BUILDING)
                .and_then(|v| v.as_text().map(|t| t.into_owned())),
        }
    }
}

/// Which step of the chain produced a height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeightSource {
    Explicit,
    Estimated,
    Levels,
    RoofHeight,
    Default,
}

impl HeightSource {
    pub fn key(self) -> &'static str {
        match self {
            HeightSource::Explicit => "height",
            HeightSource::Estimated => "est_height",
            HeightSource::Levels => "levels",
            HeightSource::RoofHeight => "roof_height",
            HeightSource::Default => "default",
        }
    }
}

impl fmt::Display for HeightSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightEstimate {
    pub meters: f64,
    pub source: HeightSource,
    /// Human-readable account, e.g. `height=12.00m`
    pub provenance: String,
}

/// Run the estimation chain. Never fails.
pub fn estimate_height(inputs: &HeightInputs, default_floor_height: f64) -> HeightEstimate {
    if let Some(h) = inputs.height {
        return HeightEstimate {
            meters: h,
            source: HeightSource::Explicit,
            provenance: format!("height={h:.2}m"),
        };
    }

    if let Some(h) = inputs.est_height {
        return HeightEstimate {
            meters: h,
            source: HeightSource::Estimated,
            provenance: format!("est_height={h:.2}m"),
        };
    }

    let building_type = inputs.building_type.as_deref();
    let floor = floor_height_for(building_type, default_floor_height);

    if let Some(levels) = inputs.building_levels {
        let mut provenance = format!("levels={levels}");
        let mut total_levels = levels;
        if let Some(roof) = inputs.roof_levels {
            total_levels += roof;
            provenance.push_str(&format!("+{roof}roof"));
        }
        provenance.push_str(&format!(", floor_height={floor:.1}m"));

        let mut meters = total_levels * floor;
        if let Some(min_height) = inputs.min_height {
            meters += min_height;
            provenance.push_str(&format!(", min_height={min_height:.1}m"));
        } else if let Some(min_level) = inputs.min_level {
            meters += min_level * floor;
            provenance.push_str(&format!(", min_level={min_level}"));
        }

        return HeightEstimate {
            meters,
            source: HeightSource::Levels,
            provenance,
        };
    }

    if let Some(roof) = inputs.roof_height {
        return HeightEstimate {
            meters: roof + floor,
            source: HeightSource::RoofHeight,
            provenance: format!("roof_height={roof:.2}m + 1_level({floor:.1}m)"),
        };
    }

    HeightEstimate {
        meters: floor,
        source: HeightSource::Default,
        provenance: format!("default_for_{}={floor:.1}m", building_type.unwrap_or("unknown")),
    }
}

/// How often each height source was used in a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeightSourceCounts(FxHashMap<HeightSource, usize>);

impl HeightSourceCounts {
    pub fn record(&mut self, source: HeightSource) {
        *self.0.entry(source).or_insert(0) += 1;
    }

    pub fn get(&self, source: HeightSource) -> usize {
        self.0.get(&source).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Sources with counts, most used first
    pub fn ranked(&self) -> Vec<(HeightSource, usize)> {
        let mut entries: Vec<_> = self.0.iter().map(|(s, n)| (*s, *n)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.key().cmp(b.0.key())));
        entries
    }
}

impl FromIterator<HeightSource> for HeightSourceCounts {
    fn from_iter<I: IntoIterator<Item = HeightSource>>(iter: I) -> Self {
        let mut counts = HeightSourceCounts::default();
        for source in iter {
            counts.record(source);
        }
        counts
    }
}
