// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate projection primitive
//!
//! Footprints arrive in whatever CRS the source uses. A [`Projection`] maps
//! each vertex into the planar meters the rest of the pipeline expects. CRS
//! validation is left to the caller; a projection only reports points it
//! cannot map.

use tracing::warn;

use crate::error::{Error, Result};
use crate::point::Point2D;

/// Mean earth radius used by [`Equirectangular`], meters
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Maps source coordinates to planar target coordinates
pub trait Projection: Send + Sync {
    /// Project one point, `None` if it cannot be mapped
    fn project(&self, x: f64, y: f64) -> Option<(f64, f64)>;
}

/// Longitude/latitude degrees to local meters around an origin.
///
/// Accurate enough for the extent of a single objective area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    pub origin_lon: f64,
    pub origin_lat: f64,
    cos_lat: f64,
}

impl Equirectangular {
    pub fn new(origin_lon: f64, origin_lat: f64) -> Self {
        Self {
            origin_lon,
            origin_lat,
            cos_lat: origin_lat.to_radians().cos(),
        }
    }
}

impl Projection for Equirectangular {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        let x = EARTH_RADIUS_M * (lon - self.origin_lon).to_radians() * self.cos_lat;
        let y = EARTH_RADIUS_M * (lat - self.origin_lat).to_radians();
        Some((x, y))
    }
}

/// Affine local-to-map conversion (false origin, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConversion {
    /// False easting (X offset to map CRS)
    pub eastings: f64,
    /// False northing (Y offset to map CRS)
    pub northings: f64,
    /// X-axis abscissa (cos of rotation angle)
    pub x_axis_abscissa: f64,
    /// X-axis ordinate (sin of rotation angle)
    pub x_axis_ordinate: f64,
    pub scale: f64,
}

impl Default for MapConversion {
    fn default() -> Self {
        Self {
            eastings: 0.0,
            northings: 0.0,
            x_axis_abscissa: 1.0,
            x_axis_ordinate: 0.0,
            scale: 1.0,
        }
    }
}

impl MapConversion {
    pub fn new(eastings: f64, northings: f64, rotation_deg: f64, scale: f64) -> Self {
        let (sin_r, cos_r) = rotation_deg.to_radians().sin_cos();
        Self {
            eastings,
            northings,
            x_axis_abscissa: cos_r,
            x_axis_ordinate: sin_r,
            scale,
        }
    }

    /// Rotation angle in radians
    #[inline]
    pub fn rotation(&self) -> f64 {
        self.x_axis_ordinate.atan2(self.x_axis_abscissa)
    }

    #[inline]
    pub fn local_to_map(&self, x: f64, y: f64) -> (f64, f64) {
        let cos_r = self.x_axis_abscissa;
        let sin_r = self.x_axis_ordinate;
        let s = self.scale;
        (
            s * (cos_r * x - sin_r * y) + self.eastings,
            s * (sin_r * x + cos_r * y) + self.northings,
        )
    }

    #[inline]
    pub fn map_to_local(&self, e: f64, n: f64) -> (f64, f64) {
        let cos_r = self.x_axis_abscissa;
        let sin_r = self.x_axis_ordinate;
        let inv_scale = if self.scale.abs() < f64::EPSILON {
            1.0
        } else {
            1.0 / self.scale
        };
        let dx = e - self.eastings;
        let dy = n - self.northings;
        (
            inv_scale * (cos_r * dx + sin_r * dy),
            inv_scale * (-sin_r * dx + cos_r * dy),
        )
    }
}

impl Projection for MapConversion {
    fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (e, n) = self.local_to_map(x, y);
        (e.is_finite() && n.is_finite()).then_some((e, n))
    }
}

/// Ring after projection, with the number of points that were dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedRing {
    pub points: Vec<Point2D>,
    pub dropped: usize,
}

/// Project every vertex of `ring`; without a projection points pass through.
///
/// Vertices that fail to project or come out non-finite are dropped.
pub fn project_ring(ring: &[Point2D], projection: Option<&dyn Projection>) -> ProjectedRing {
    let mut out = ProjectedRing {
        points: Vec::with_capacity(ring.len()),
        dropped: 0,
    };
    for p in ring {
        let mapped = match projection {
            Some(proj) => proj.project(p.x, p.y).map(Point2D::from),
            None => Some(*p),
        };
        match mapped {
            Some(q) if q.is_finite() => out.points.push(q),
            _ => out.dropped += 1,
        }
    }
    if out.dropped > 0 {
        warn!(dropped = out.dropped, kept = out.points.len(), "skipped unprojectable vertices");
    }
    out
}

fn parse_numbers(args: &str, expected: usize) -> Result<Vec<f64>> {
    let values = args
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::InvalidProjection(format!("{args}: {e}")))?;
    if values.len() != expected {
        return Err(Error::InvalidProjection(format!(
            "{args}: expected {expected} values, got {}",
            values.len()
        )));
    }
    Ok(values)
}

/// Build a projection from a target description.
///
/// * `None` or empty: no projection
/// * `equirectangular:<lon0>,<lat0>`
/// * `map:<eastings>,<northings>,<rotation_deg>,<scale>`
pub fn projection_from_target(target: Option<&str>) -> Result<Option<Box<dyn Projection>>> {
    let target = match target.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(t) => t,
    };

    let (kind, args) = target
        .split_once(':')
        .ok_or_else(|| Error::InvalidProjection(target.to_string()))?;

    match kind.trim().to_ascii_lowercase().as_str() {
        "equirectangular" | "eqc" => {
            let v = parse_numbers(args, 2)?;
            Ok(Some(Box::new(Equirectangular::new(v[0], v[1]))))
        }
        "map" => {
            let v = parse_numbers(args, 4)?;
            Ok(Some(Box::new(MapConversion::new(v[0], v[1], v[2], v[3]))))
        }
        other => Err(Error::InvalidProjection(format!("unknown projection '{other}'"))),
    }
}
