// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI defaults loaded from environment variables.

use buildgen_core::DEFAULT_FLOOR_HEIGHT_M;

/// Defaults that command-line flags may override.
#[derive(Debug, Clone)]
pub struct Config {
    /// Random seed; wall-clock time when unset.
    pub seed: Option<u64>,
    /// Floor height for unknown building types, meters.
    pub floor_height_m: f64,
    /// Objective file to write.
    pub output: String,
    /// Version written into the objective header.
    pub generator_version: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            seed: std::env::var("BUILDGEN_SEED").ok().and_then(|s| s.parse().ok()),
            floor_height_m: std::env::var("BUILDGEN_FLOOR_HEIGHT")
                .unwrap_or_else(|_| DEFAULT_FLOOR_HEIGHT_M.to_string())
                .parse()
                .unwrap_or(DEFAULT_FLOOR_HEIGHT_M),
            output: std::env::var("BUILDGEN_OUTPUT").unwrap_or_else(|_| "objective.txt".into()),
            generator_version: std::env::var("BUILDGEN_GENERATOR_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").into()),
        }
    }

    /// Configured seed, or one derived from the current time.
    pub fn seed_or_now(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
