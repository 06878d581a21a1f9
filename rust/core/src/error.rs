// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the footprint-to-feature pipeline.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning footprints into placement records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input record or argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// Rectangle fitting or projection failed.
    #[error("geometry error: {0}")]
    Geometry(#[from] buildgen_geometry::Error),

    /// Every footprint in the batch was skipped.
    #[error("no structures survived processing ({skipped} records skipped)")]
    NoStructures { skipped: usize },

    /// Nearest-model search was given an empty catalog.
    #[error("cannot match against an empty catalog")]
    EmptyCatalog,

    /// Selection criterion or distribution name was not recognized.
    #[error("unknown {kind}: '{name}'")]
    UnknownOption { kind: &'static str, name: String },

    /// No value entry for a catalog type.
    #[error("no value configured for feature type {0}")]
    MissingValue(i64),

    /// A placement record line could not be parsed.
    #[error("invalid feature entry: {0}")]
    InvalidRecord(String),

    /// GeoJSON input could not be read.
    #[error("geojson error: {0}")]
    GeoJson(String),

    /// Catalog, values table or configuration JSON error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<geojson::Error> for Error {
    fn from(err: geojson::Error) -> Self {
        Error::GeoJson(err.to_string())
    }
}
