// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free-form footprint tags and the rules that read them.
//!
//! Tags come from the source data as loosely typed values. Lookups go through
//! alias lists (first present key wins) and string values are lowercased, so
//! `Building=Office` and `building=office` read the same.

use std::borrow::Cow;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A loosely typed tag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Tags attached to one footprint record.
pub type Tags = FxHashMap<String, TagValue>;

/// Keys that mark a footprint as something other than a generic building.
pub const CLASSIFICATION_KEYS: &[&str] = &[
    "building",
    "aeroway",
    "amenity",
    "barrier",
    "bms",
    "bridge",
    "diplomatic",
    "leisure",
    "man_made",
    "military",
    "office",
    "power",
    "religion",
    "service",
    "sport",
    "tower",
];

/// Display-name keys, most preferred first.
pub const NAME_KEYS: &[&str] = &["name:en", "name:int", "name"];

/// String values that say nothing beyond "this is a building".
const PLACEHOLDER_VALUES: &[&str] = &[
    "", "yes", "no", "building", "roof", "0", "1", "true", "false", "none",
];

impl TagValue {
    /// Null and NaN count as missing.
    pub fn is_absent(&self) -> bool {
        match self {
            TagValue::Null => true,
            TagValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Copy with string content lowercased.
    pub fn normalized(&self) -> TagValue {
        match self {
            TagValue::String(s) => TagValue::String(s.to_lowercase()),
            other => other.clone(),
        }
    }

    /// Textual form used by keyword matching and catalog queries.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            TagValue::Null => None,
            TagValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            TagValue::Number(n) if n.is_nan() => None,
            TagValue::Number(n) => Some(Cow::Owned(n.to_string())),
            TagValue::String(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }

    /// Non-empty strings, non-zero numbers and `true`.
    pub fn is_truthy(&self) -> bool {
        match self {
            TagValue::Null => false,
            TagValue::Bool(b) => *b,
            TagValue::Number(n) => *n != 0.0 && !n.is_nan(),
            TagValue::String(s) => !s.is_empty(),
        }
    }

    /// Whether the value says something specific about the footprint.
    ///
    /// Booleans, null, 0 and 1, blank strings and the generic placeholders
    /// (`yes`, `building`, `roof`, ...) are not special.
    pub fn is_special(&self) -> bool {
        match self {
            TagValue::Null | TagValue::Bool(_) => false,
            TagValue::Number(n) => !(n.is_nan() || *n == 0.0 || *n == 1.0),
            TagValue::String(s) => {
                let lowered = s.trim().to_lowercase();
                !PLACEHOLDER_VALUES.contains(&lowered.as_str())
            }
        }
    }
}

impl From<&serde_json::Value> for TagValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => TagValue::Null,
            Value::Bool(b) => TagValue::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(TagValue::Null, TagValue::Number),
            Value::String(s) => TagValue::String(s.clone()),
            other => TagValue::String(other.to_string()),
        }
    }
}

/// First present value among `aliases`, normalized.
pub fn first_value(tags: &Tags, aliases: &[&str]) -> Option<TagValue> {
    aliases
        .iter()
        .filter_map(|key| tags.get(*key))
        .find(|value| !value.is_absent())
        .map(TagValue::normalized)
}

/// Display name of the footprint, original case kept.
pub fn display_name(tags: &Tags) -> Option<String> {
    NAME_KEYS
        .iter()
        .filter_map(|key| tags.get(*key))
        .filter(|value| !value.is_absent())
        .find_map(|value| value.as_text().map(|t| t.trim().to_string()))
        .filter(|name| !name.is_empty())
}

/// Classification tags found on a footprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub tags: FxHashMap<String, TagValue>,
    /// At least one classification value is special
    pub detailed: bool,
}

impl Classification {
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    /// Lowercased text of a classification tag, if present and truthy.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.tags
            .get(key)
            .filter(|value| value.is_truthy())
            .and_then(TagValue::as_text)
    }
}

/// Collect the classification tags and the `detailed` flag.
pub fn classify(tags: &Tags) -> Classification {
    let mut class = Classification::default();
    for key in CLASSIFICATION_KEYS {
        if let Some(value) = first_value(tags, &[*key]) {
            class.detailed |= value.is_special();
            class.tags.insert((*key).to_string(), value);
        }
    }
    class
}

/// Split a tag value into lowercase terms on commas, whitespace, slashes,
/// backslashes and dots.
pub fn split_terms(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c == '/' || c == '\\' || c == '.' || c.is_whitespace())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}
