// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for footprint geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fitting a footprint rectangle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Fewer usable points than a polygon needs.
    #[error("footprint has {0} usable points, at least 3 are required")]
    TooFewPoints(usize),

    /// All points lie on a single line (or coincide).
    #[error("footprint hull is degenerate: {0}")]
    DegenerateHull(String),

    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    /// Projection target string could not be understood.
    #[error("invalid projection: {0}")]
    InvalidProjection(String),
}
