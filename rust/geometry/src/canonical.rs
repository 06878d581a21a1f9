// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rectangle canonicalization
//!
//! Turns an arbitrary footprint ring into a [`FittedRectangle`]: the
//! minimum-area enclosing rectangle with a repaired corner order, the four
//! side lengths and a rotation in degrees.
//!
//! Rotation convention: take the leftmost corner (lowest y on ties), follow
//! the longer of its two incident edges (the "next" edge on ties) and report
//! `3π/2 - atan(slope)` in degrees, normalized to `[0, 360)`. A vertical
//! longer edge is treated as the limit of the slope, so it yields 180° when
//! the edge climbs and 0° when it descends.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::hull::minimum_area_rectangle;
use crate::point::Point2D;

/// Consecutive edges whose dot product exceeds this are not perpendicular
pub const PERPENDICULAR_TOLERANCE: f64 = 1e-6;

/// Rectangle fitted to a footprint ring
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FittedRectangle {
    pub center: Point2D,
    /// Degrees in `[0, 360)`
    pub rotation: f64,
    /// Cyclic edge lengths of `corners`
    pub sides: [f64; 4],
    pub corners: [Point2D; 4],
}

impl FittedRectangle {
    /// Longer of the two distinct sides
    pub fn length(&self) -> f64 {
        self.sides[0].max(self.sides[1])
    }

    /// Shorter of the two distinct sides
    pub fn width(&self) -> f64 {
        self.sides[0].min(self.sides[1])
    }
}

/// Rotation and side lengths of an ordered rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub rotation: f64,
    pub sides: [f64; 4],
}

/// `sides[i]` is the distance from corner `i` to corner `i + 1` (cyclic).
pub fn side_lengths(corners: &[Point2D; 4]) -> [f64; 4] {
    let mut sides = [0.0; 4];
    for (i, side) in sides.iter_mut().enumerate() {
        *side = corners[i].distance_to(&corners[(i + 1) % 4]);
    }
    sides
}

/// Repair a crossing corner order in place.
///
/// Walks the four corners; whenever the edges meeting at corner `i + 1` are
/// not perpendicular, corners `i + 2` and `i + 3` are swapped. Later checks see
/// the result of earlier swaps. Returns the number of swaps made.
pub fn repair_corner_order(corners: &mut [Point2D; 4]) -> usize {
    let mut swaps = 0;
    for i in 0..4 {
        let p0 = corners[i];
        let p1 = corners[(i + 1) % 4];
        let p2 = corners[(i + 2) % 4];
        let dot = p0.to(&p1).dot(&p1.to(&p2));
        if dot.abs() > PERPENDICULAR_TOLERANCE {
            corners.swap((i + 2) % 4, (i + 3) % 4);
            swaps += 1;
            debug!(corner = i, dot, "swapped rectangle corners");
        }
    }
    swaps
}

/// Rotation (degrees) and cyclic side lengths of an ordered rectangle.
pub fn rotation_and_sides(corners: &[Point2D; 4]) -> Result<Orientation> {
    if let Some(bad) = corners.iter().find(|p| !p.is_finite()) {
        return Err(Error::NonFiniteCoordinate { x: bad.x, y: bad.y });
    }

    let sides = side_lengths(corners);

    let leftmost = (0..4)
        .min_by(|&a, &b| {
            corners[a]
                .x
                .total_cmp(&corners[b].x)
                .then(corners[a].y.total_cmp(&corners[b].y))
        })
        .unwrap_or(0);
    let previous = (leftmost + 3) % 4;
    let next = (leftmost + 1) % 4;

    // sides[previous] joins previous -> leftmost, sides[leftmost] joins leftmost -> next
    let neighbor = if sides[previous] > sides[leftmost] {
        corners[previous]
    } else {
        corners[next]
    };

    let origin = corners[leftmost];
    let dx = neighbor.x - origin.x;
    let dy = neighbor.y - origin.y;
    let slope_angle = if dx == 0.0 {
        if dy < 0.0 {
            -FRAC_PI_2
        } else {
            FRAC_PI_2
        }
    } else {
        (dy / dx).atan()
    };

    let rotation = (1.5 * PI - slope_angle).to_degrees().rem_euclid(360.0);
    Ok(Orientation { rotation, sides })
}

/// Fit the canonical rectangle of a footprint ring.
pub fn fit_footprint(ring: &[Point2D]) -> Result<FittedRectangle> {
    let valid: Vec<Point2D> = ring.iter().copied().filter(Point2D::is_finite).collect();
    if valid.len() < 3 {
        return Err(Error::TooFewPoints(valid.len()));
    }

    let rect = minimum_area_rectangle(&valid)?;
    let mut corners = rect.corners;
    let swaps = repair_corner_order(&mut corners);
    if swaps > 0 {
        debug!(swaps, "repaired fitted rectangle corner order");
    }

    let Orientation { rotation, sides } = rotation_and_sides(&corners)?;

    Ok(FittedRectangle {
        center: rect.center,
        rotation,
        sides,
        corners,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    fn rectangle(w: f64, h: f64, angle_deg: f64) -> [Point2D; 4] {
        let (s, c) = angle_deg.to_radians().sin_cos();
        let rot = |x: f64, y: f64| p(50.0 + x * c - y * s, -20.0 + x * s + y * c);
        [rot(0.0, 0.0), rot(w, 0.0), rot(w, h), rot(0.0, h)]
    }

    fn assert_rectangular(corners: &[Point2D; 4]) {
        let sides = side_lengths(corners);
        assert_abs_diff_eq!(sides[0], sides[2], epsilon = 1e-9);
        assert_abs_diff_eq!(sides[1], sides[3], epsilon = 1e-9);
    }

    #[test]
    fn square_uses_next_edge_on_ties() {
        let fitted = fit_footprint(&[p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]).unwrap();
        assert_relative_eq!(fitted.length(), 10.0);
        assert_relative_eq!(fitted.width(), 10.0);
        assert_relative_eq!(fitted.center.x, 5.0);
        assert_relative_eq!(fitted.center.y, 5.0);
        assert_relative_eq!(fitted.rotation, 270.0);
    }

    #[test]
    fn vertical_longer_edge_is_180_degrees() {
        // Leftmost corner (0,0), longer edge climbs straight up to (0,20)
        let corners = [p(0.0, 0.0), p(5.0, 0.0), p(5.0, 20.0), p(0.0, 20.0)];
        let orientation = rotation_and_sides(&corners).unwrap();
        assert_relative_eq!(orientation.rotation, 180.0);
    }

    #[test]
    fn horizontal_longer_edge_is_270_degrees() {
        let corners = [p(0.0, 0.0), p(20.0, 0.0), p(20.0, 5.0), p(0.0, 5.0)];
        let orientation = rotation_and_sides(&corners).unwrap();
        assert_relative_eq!(orientation.rotation, 270.0);
        assert_eq!(orientation.sides, [20.0, 5.0, 20.0, 5.0]);
    }

    #[test]
    fn rotated_rectangle_follows_long_edge_slope() {
        let corners = rectangle(30.0, 10.0, 20.0);
        let orientation = rotation_and_sides(&corners).unwrap();
        // long edge rises at 20 degrees: 270 - 20
        assert_abs_diff_eq!(orientation.rotation, 250.0, epsilon = 1e-9);
    }

    #[test]
    fn crossing_order_is_repaired() {
        let [a, b, c, d] = rectangle(12.0, 7.0, 35.0);
        for order in [[a, b, d, c], [a, c, b, d], [c, a, b, d], [b, d, a, c]] {
            let mut corners = order;
            assert!(repair_corner_order(&mut corners) > 0);
            assert_rectangular(&corners);
        }
    }

    #[test]
    fn every_corner_order_ends_rectangular() {
        let base = rectangle(9.0, 4.0, 61.0);
        let orders: [[usize; 4]; 24] = [
            [0, 1, 2, 3], [0, 1, 3, 2], [0, 2, 1, 3], [0, 2, 3, 1], [0, 3, 1, 2], [0, 3, 2, 1],
            [1, 0, 2, 3], [1, 0, 3, 2], [1, 2, 0, 3], [1, 2, 3, 0], [1, 3, 0, 2], [1, 3, 2, 0],
            [2, 0, 1, 3], [2, 0, 3, 1], [2, 1, 0, 3], [2, 1, 3, 0], [2, 3, 0, 1], [2, 3, 1, 0],
            [3, 0, 1, 2], [3, 0, 2, 1], [3, 1, 0, 2], [3, 1, 2, 0], [3, 2, 0, 1], [3, 2, 1, 0],
        ];
        for order in orders {
            let mut corners = [base[order[0]], base[order[1]], base[order[2]], base[order[3]]];
            repair_corner_order(&mut corners);
            assert_rectangular(&corners);
            let orientation = rotation_and_sides(&corners).unwrap();
            assert!((0.0..360.0).contains(&orientation.rotation));
        }
    }

    #[test]
    fn valid_order_is_left_alone() {
        let mut corners = rectangle(5.0, 3.0, 12.0);
        let before = corners;
        assert_eq!(repair_corner_order(&mut corners), 0);
        assert_eq!(corners, before);
    }

    #[test]
    fn non_finite_corner_is_an_error() {
        let corners = [p(0.0, 0.0), p(1.0, 0.0), p(f64::NAN, 1.0), p(0.0, 1.0)];
        assert!(matches!(
            rotation_and_sides(&corners),
            Err(Error::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn fit_skips_non_finite_points() {
        let ring = [
            p(0.0, 0.0),
            p(f64::NAN, 3.0),
            p(8.0, 0.0),
            p(8.0, 4.0),
            p(0.0, 4.0),
        ];
        let fitted = fit_footprint(&ring).unwrap();
        assert_relative_eq!(fitted.length(), 8.0, epsilon = 1e-9);
        assert_relative_eq!(fitted.width(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn fit_rejects_two_points() {
        assert_eq!(
            fit_footprint(&[p(0.0, 0.0), p(1.0, 1.0)]).unwrap_err(),
            Error::TooFewPoints(2)
        );
    }
}
