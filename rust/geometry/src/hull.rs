// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convex hull and minimum-area enclosing rectangle
//!
//! The rectangle search uses rotating calipers: the optimal rectangle has one
//! side collinear with a hull edge, so every hull edge is tried as the frame
//! axis and the smallest projected extent wins.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::point::Point2D;

/// Hull storage; building footprints rarely exceed a handful of hull vertices
pub type Hull = SmallVec<[Point2D; 16]>;

/// Edges shorter than this are ignored when choosing a calipers frame
const MIN_EDGE_LENGTH: f64 = 1e-12;

/// Oriented rectangle described by its corners (counter-clockwise) and center
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rectangle {
    pub corners: [Point2D; 4],
    pub center: Point2D,
}

impl Rectangle {
    /// Lengths of the four cyclic edges, `sides[i] = |corners[i] -> corners[i+1]|`
    pub fn side_lengths(&self) -> [f64; 4] {
        crate::canonical::side_lengths(&self.corners)
    }

    pub fn area(&self) -> f64 {
        let sides = self.side_lengths();
        sides[0] * sides[1]
    }
}

#[inline]
fn cross(o: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull by Andrew's monotone chain.
///
/// Non-finite points are ignored, duplicates and collinear points dropped.
/// The hull is counter-clockwise and starts at the lowest-x (then lowest-y)
/// point. Fewer than 3 returned points means the input is degenerate.
pub fn convex_hull(points: &[Point2D]) -> Hull {
    let mut pts: Vec<Point2D> = points.iter().copied().filter(Point2D::is_finite).collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();

    if pts.len() < 3 {
        return pts.into_iter().collect();
    }

    let mut lower: Hull = SmallVec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Hull = SmallVec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Minimum-area rectangle enclosing `points`.
///
/// Corners come back counter-clockwise, starting at the (min-u, min-v) corner
/// of the winning edge frame. Coordinates are projected relative to the first
/// hull vertex to keep precision for large projected values.
pub fn minimum_area_rectangle(points: &[Point2D]) -> Result<Rectangle> {
    let finite = points.iter().filter(|p| p.is_finite()).count();
    if finite < 3 {
        return Err(Error::TooFewPoints(finite));
    }

    let hull = convex_hull(points);
    if hull.len() < 3 {
        return Err(Error::DegenerateHull(format!(
            "{} distinct non-collinear points",
            hull.len()
        )));
    }

    let origin = hull[0];
    let n = hull.len();

    // (area, u, v, min_u, max_u, min_v, max_v)
    let mut best: Option<(f64, Vector2<f64>, Vector2<f64>, f64, f64, f64, f64)> = None;

    for i in 0..n {
        let edge = hull[i].to(&hull[(i + 1) % n]);
        let len = edge.norm();
        if len <= MIN_EDGE_LENGTH {
            continue;
        }
        let u = edge / len;
        let v = Vector2::new(-u.y, u.x);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in hull.iter() {
            let rel = origin.to(p);
            let pu = rel.dot(&u);
            let pv = rel.dot(&v);
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if best.map_or(true, |b| area < b.0) {
            best = Some((area, u, v, min_u, max_u, min_v, max_v));
        }
    }

    let (area, u, v, min_u, max_u, min_v, max_v) =
        best.ok_or_else(|| Error::DegenerateHull("no usable hull edge".to_string()))?;
    if area.is_nan() || area <= 0.0 {
        return Err(Error::DegenerateHull(format!("zero-area rectangle ({area})")));
    }

    let at = |a: f64, b: f64| -> Point2D {
        let p = u * a + v * b;
        Point2D::new(origin.x + p.x, origin.y + p.y)
    };

    Ok(Rectangle {
        corners: [
            at(min_u, min_v),
            at(max_u, min_v),
            at(max_u, max_v),
            at(min_u, max_v),
        ],
        center: at((min_u + max_u) / 2.0, (min_v + max_v) / 2.0),
    })
}
