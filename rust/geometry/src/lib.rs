// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BuildGen Geometry
//!
//! Rectangle fitting for building footprints: convex hull, minimum-area
//! enclosing rectangle, corner-order repair and the rotation convention used
//! to place assets, plus the projection primitive applied to raw vertices.
//!
//! ```rust,ignore
//! use buildgen_geometry::{fit_footprint, Point2D};
//!
//! let ring = [
//!     Point2D::new(0.0, 0.0),
//!     Point2D::new(10.0, 0.0),
//!     Point2D::new(10.0, 10.0),
//!     Point2D::new(0.0, 10.0),
//! ];
//! let fitted = fit_footprint(&ring)?;
//! assert_eq!(fitted.rotation, 270.0);
//! ```

pub mod canonical;
pub mod error;
pub mod hull;
pub mod point;
pub mod projection;

pub use nalgebra::Vector2;

pub use canonical::{
    fit_footprint, repair_corner_order, rotation_and_sides, side_lengths, FittedRectangle,
    Orientation, PERPENDICULAR_TOLERANCE,
};
pub use error::{Error, Result};
pub use hull::{convex_hull, minimum_area_rectangle, Hull, Rectangle};
pub use point::Point2D;
pub use projection::{
    project_ring, projection_from_target, Equirectangular, MapConversion, ProjectedRing,
    Projection,
};
