// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collision-aware random placement inside a disk.
//!
//! Features are placed one at a time around the origin. Each feature gets a
//! safety buffer, candidate positions are drawn from the configured
//! distribution in three phases, and the first candidate that neither
//! collides with a committed box nor leaves the disk is accepted. When every
//! attempt fails the least-overlapping candidate is committed instead.
//!
//! The occupied-box set is order dependent, so placement is sequential.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::{Beta, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, CatalogModel};
use crate::config::PlacementConfig;
use crate::error::{Error, Result};

/// Spatial law for candidate positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    /// Denser towards the center
    #[default]
    #[serde(alias = "Normal Distribution")]
    Normal,
    /// Denser towards the rim
    #[serde(alias = "Peripheral Distribution")]
    Peripheral,
    /// Even density over the disk
    #[serde(alias = "Uniform Distribution")]
    Uniform,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Distribution::Normal => "Normal",
            Distribution::Peripheral => "Peripheral",
            Distribution::Uniform => "Uniform",
        })
    }
}

impl FromStr for Distribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        let key = lowered.strip_suffix("distribution").unwrap_or(lowered.as_str()).trim();
        match key {
            "normal" => Ok(Distribution::Normal),
            "peripheral" => Ok(Distribution::Peripheral),
            "uniform" => Ok(Distribution::Uniform),
            _ => Err(Error::UnknownOption {
                kind: "distribution",
                name: s.to_string(),
            }),
        }
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Box of size `width` × `length` centered on `(x, y)`
    pub fn centered(x: f64, y: f64, width: f64, length: f64) -> Self {
        let (hw, hl) = (width / 2.0, length / 2.0);
        Self {
            min_x: x - hw,
            min_y: y - hl,
            max_x: x + hw,
            max_y: y + hl,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Half of the larger side
    pub fn radius(&self) -> f64 {
        self.width().max(self.height()) / 2.0
    }

    /// Strictly positive extent on both axes
    pub fn is_valid(&self) -> bool {
        self.min_x < self.max_x && self.min_y < self.max_y
    }

    /// Overlap area with `other`, `None` when they are apart.
    ///
    /// Boxes that only touch yield `Some(0.0)`.
    pub fn overlap_area(&self, other: &BoundingBox) -> Option<f64> {
        if self.min_x > other.max_x
            || self.max_x < other.min_x
            || self.min_y > other.max_y
            || self.max_y < other.min_y
        {
            return None;
        }
        let w = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let h = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        Some(w * h)
    }

    /// Farthest corner from the origin
    pub fn max_corner_distance(&self) -> f64 {
        [
            (self.min_x, self.min_y),
            (self.min_x, self.max_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
        ]
        .iter()
        .map(|(x, y)| x.hypot(*y))
        .fold(0.0, f64::max)
    }
}

/// Boxes committed during one placement session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupiedBoxes {
    boxes: Vec<BoundingBox>,
}

impl OccupiedBoxes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn as_slice(&self) -> &[BoundingBox] {
        &self.boxes
    }

    fn commit(&mut self, bbox: BoundingBox) {
        self.boxes.push(bbox);
    }
}

/// Collision verdict with an overlap score, lower is better
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionCheck {
    pub collides: bool,
    pub score: f64,
}

impl CollisionCheck {
    const CLEAR: CollisionCheck = CollisionCheck {
        collides: false,
        score: 0.0,
    };
}

/// Score `candidate` against the committed boxes.
///
/// The score is the largest overlap ratio relative to the candidate's area,
/// raised by a proximity penalty for boxes whose centers are closer than the
/// sum of their bounding radii.
pub fn collision_score(candidate: &BoundingBox, occupied: &[BoundingBox], config: &PlacementConfig) -> CollisionCheck {
    if occupied.is_empty() {
        return CollisionCheck::CLEAR;
    }
    if !candidate.is_valid() {
        warn!(?candidate, "invalid bounding box treated as collision");
        return CollisionCheck {
            collides: true,
            score: f64::INFINITY,
        };
    }

    let area = candidate.area();
    let mut collides = false;
    let mut score: f64 = 0.0;

    for existing in occupied {
        let Some(overlap) = candidate.overlap_area(existing) else {
            continue;
        };
        if overlap < config.negligible_overlap {
            continue;
        }
        collides = true;
        score = score.max(overlap / area);
        if score > config.severe_overlap {
            return CollisionCheck { collides, score };
        }
    }

    let (cx, cy) = candidate.center();
    let candidate_radius = candidate.radius();
    for existing in occupied {
        let (ex, ey) = existing.center();
        let distance = (cx - ex).hypot(cy - ey);
        let min_distance = candidate_radius + existing.radius();
        let proximity = min_distance / distance.max(0.001) - 1.0;
        if proximity > 0.0 {
            score = score.max(proximity * config.proximity_weight);
            if proximity > config.proximity_slack {
                collides = true;
            }
        }
    }

    CollisionCheck { collides, score }
}

fn polar(distance: f64, angle: f64) -> (f64, f64) {
    (distance * angle.cos(), distance * angle.sin())
}

fn normal_sample<R: Rng + ?Sized>(rng: &mut R, sd: f64) -> f64 {
    Normal::new(0.0, sd).map_or(0.0, |dist| rng.sample(dist))
}

/// Candidate position for attempt number `attempt` (zero based).
pub fn candidate_position<R: Rng + ?Sized>(
    distribution: Distribution,
    attempt: usize,
    radius: f64,
    config: &PlacementConfig,
    rng: &mut R,
) -> (f64, f64) {
    let span = config.max_attempts.saturating_sub(config.fallback_phase).max(1) as f64;
    let t = attempt.saturating_sub(config.fallback_phase) as f64 / span;

    match distribution {
        Distribution::Normal => {
            if attempt < config.second_phase {
                polar(radius * normal_sample(rng, 0.3), rng.random_range(0.0..TAU))
            } else if attempt < config.fallback_phase {
                polar(radius * normal_sample(rng, 0.5), rng.random_range(0.0..TAU))
            } else {
                polar(t * radius * 0.9, t * 10.0 * PI)
            }
        }
        Distribution::Peripheral => {
            if attempt < config.second_phase {
                let skew = Beta::new(2.0, 1.0).map_or(1.0, |dist| rng.sample(dist));
                polar(radius * (0.4 + 0.6 * skew), rng.random_range(0.0..TAU))
            } else if attempt < config.fallback_phase {
                let angle = rng.random_range(0.0..TAU);
                polar(radius * rng.random_range(0.7..0.95), angle)
            } else {
                let quadrant = (attempt % 4) as f64;
                let angle = quadrant * FRAC_PI_2 + rng.random_range(-FRAC_PI_4..FRAC_PI_4);
                polar(radius * (0.7 + 0.3 * rng.random::<f64>()), angle)
            }
        }
        Distribution::Uniform => {
            if attempt < config.second_phase {
                polar(radius * rng.random::<f64>().sqrt(), rng.random_range(0.0..TAU))
            } else if attempt < config.fallback_phase {
                const CELLS: usize = 6;
                let cell = attempt - config.second_phase;
                let half = CELLS as f64 / 2.0 - 0.5;
                let gx = (cell % CELLS) as f64 - half;
                let gy = (cell / CELLS) as f64 - half;
                let scale = radius / (CELLS as f64 / 2.0);
                let jitter = scale * 0.3 * rng.random::<f64>();
                let (jx, jy) = polar(jitter, rng.random_range(0.0..TAU));
                (gx * scale + jx, gy * scale + jy)
            } else {
                polar(radius * t.sqrt(), t * 15.0 * PI)
            }
        }
    }
}

/// How a feature ended up where it is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementOutcome {
    /// Clear of other features and inside the disk
    Placed,
    /// Every attempt failed; least-overlapping candidate used
    BestEffort { score: f64 },
    /// No candidate was recorded at all
    Origin,
}

/// Final position of one feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// Candidates tried
    pub attempts: usize,
    pub outcome: PlacementOutcome,
}

/// Sequential placement session around the origin.
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    radius: f64,
    config: PlacementConfig,
    occupied: OccupiedBoxes,
}

impl PlacementEngine {
    pub fn new(radius: f64, config: PlacementConfig) -> Self {
        Self {
            radius,
            config,
            occupied: OccupiedBoxes::new(),
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn occupied(&self) -> &OccupiedBoxes {
        &self.occupied
    }

    /// Safety buffer added to both dimensions while searching
    pub fn buffer_for(&self, width: f64, length: f64) -> f64 {
        self.config.min_buffer.max(width.max(length) * self.config.buffer_ratio)
    }

    /// Place a `width` × `length` feature and commit its true box.
    pub fn place<R: Rng + ?Sized>(&mut self, width: f64, length: f64, rng: &mut R) -> Placement {
        let buffer = self.buffer_for(width, length);
        let (search_w, search_l) = (width + buffer, length + buffer);
        let mut best: Option<(f64, f64, f64)> = None;

        for attempt in 0..self.config.max_attempts {
            let (x, y) = candidate_position(self.config.distribution, attempt, self.radius, &self.config, rng);
            let candidate = BoundingBox::centered(x, y, search_w, search_l);
            let within = attempt >= self.config.fallback_phase || candidate.max_corner_distance() <= self.radius;
            let check = collision_score(&candidate, self.occupied.as_slice(), &self.config);

            if within && best.map_or(true, |(_, _, score)| check.score < score) {
                best = Some((x, y, check.score));
            }

            if within && !check.collides {
                self.occupied.commit(BoundingBox::centered(x, y, width, length));
                debug!(x, y, attempt = attempt + 1, "feature placed");
                return Placement {
                    x,
                    y,
                    attempts: attempt + 1,
                    outcome: PlacementOutcome::Placed,
                };
            }
            debug!(x, y, attempt = attempt + 1, within, score = check.score, "placement attempt rejected");
        }

        let attempts = self.config.max_attempts;
        let placement = match best {
            Some((x, y, score)) => {
                warn!(x, y, attempts, score, "placed with collision after exhausting attempts");
                Placement {
                    x,
                    y,
                    attempts,
                    outcome: PlacementOutcome::BestEffort { score },
                }
            }
            None => {
                error!(attempts, "no usable position found, placing at origin");
                Placement {
                    x: 0.0,
                    y: 0.0,
                    attempts,
                    outcome: PlacementOutcome::Origin,
                }
            }
        };
        self.occupied
            .commit(BoundingBox::centered(placement.x, placement.y, width, length));
        placement
    }
}

/// Draw `count` models uniformly with replacement.
pub fn sample_catalog<R: Rng + ?Sized>(catalog: &Catalog, count: usize, rng: &mut R) -> Result<Vec<CatalogModel>> {
    if catalog.is_empty() {
        return Err(Error::EmptyCatalog);
    }
    Ok((0..count)
        .filter_map(|_| catalog.get(rng.random_range(0..catalog.len())).cloned())
        .collect())
}

/// Place every model in order, one session for the whole slice.
pub fn place_features<R: Rng + ?Sized>(
    models: &[CatalogModel],
    radius: f64,
    config: &PlacementConfig,
    rng: &mut R,
) -> Vec<Placement> {
    info!(
        features = models.len(),
        radius,
        distribution = %config.distribution,
        "placing features"
    );
    let mut engine = PlacementEngine::new(radius, config.clone());
    let placements: Vec<Placement> = models
        .iter()
        .map(|model| engine.place(model.width, model.length, rng))
        .collect();

    let degraded = placements
        .iter()
        .filter(|p| p.outcome != PlacementOutcome::Placed)
        .count();
    if degraded > 0 {
        warn!(degraded, total = placements.len(), "some features overlap");
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(distribution: Distribution) -> PlacementConfig {
        PlacementConfig {
            distribution,
            ..Default::default()
        }
    }

    fn model(width: f64, length: f64) -> CatalogModel {
        CatalogModel {
            ct_number: 1,
            model_number: None,
            feature_name: "box".to_string(),
            feature_type: 1,
            width,
            length,
            height: 1.0,
            length_axis: Default::default(),
            width_off: 0.0,
            length_off: 0.0,
        }
    }

    #[test]
    fn overlap_area_is_strict() {
        let a = BoundingBox::centered(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::centered(1.0, 1.0, 2.0, 2.0);
        assert_relative_eq!(a.overlap_area(&b).unwrap(), 1.0);
        let touching = BoundingBox::centered(2.0, 0.0, 2.0, 2.0);
        assert_eq!(a.overlap_area(&touching), Some(0.0));
        let apart = BoundingBox::centered(5.0, 0.0, 2.0, 2.0);
        assert_eq!(a.overlap_area(&apart), None);
    }

    #[test]
    fn empty_set_never_collides() {
        let cfg = PlacementConfig::default();
        let degenerate = BoundingBox::centered(0.0, 0.0, 0.0, 0.0);
        assert_eq!(collision_score(&degenerate, &[], &cfg), CollisionCheck::CLEAR);
    }

    #[test]
    fn invalid_box_is_a_collision() {
        let cfg = PlacementConfig::default();
        let occupied = [BoundingBox::centered(100.0, 100.0, 1.0, 1.0)];
        let check = collision_score(&BoundingBox::centered(0.0, 0.0, 0.0, 4.0), &occupied, &cfg);
        assert!(check.collides);
        assert!(check.score.is_infinite());
    }

    #[test]
    fn severe_overlap_ends_scan() {
        let cfg = PlacementConfig::default();
        let occupied = [BoundingBox::centered(0.0, 0.0, 10.0, 10.0)];
        let check = collision_score(&BoundingBox::centered(1.0, 0.0, 10.0, 10.0), &occupied, &cfg);
        assert!(check.collides);
        assert_relative_eq!(check.score, 0.9);
    }

    #[test]
    fn proximity_penalty() {
        let cfg = PlacementConfig::default();
        let occupied = [BoundingBox::centered(0.0, 0.0, 20.0, 2.0)];

        // radii 10 + 1, centers 10 apart: ratio 0.1 stays within the slack
        let near = collision_score(&BoundingBox::centered(0.0, 10.0, 2.0, 2.0), &occupied, &cfg);
        assert!(!near.collides);
        assert_relative_eq!(near.score, 0.05, epsilon = 1e-12);

        let close = collision_score(&BoundingBox::centered(0.0, 3.0, 2.0, 2.0), &occupied, &cfg);
        assert!(close.collides);
        assert_relative_eq!(close.score, (11.0 / 3.0 - 1.0) * 0.5, epsilon = 1e-12);

        let far = collision_score(&BoundingBox::centered(0.0, 12.0, 2.0, 2.0), &occupied, &cfg);
        assert_eq!(far, CollisionCheck::CLEAR);
    }

    #[test]
    fn proximity_without_overlap_collides_beyond_slack() {
        let cfg = PlacementConfig::default();
        // tall thin box next to a wide flat one: no overlap, centers close
        let occupied = [BoundingBox::centered(0.0, 0.0, 20.0, 1.0)];
        let candidate = BoundingBox::centered(0.0, 2.0, 20.0, 1.0);
        let check = collision_score(&candidate, &occupied, &cfg);
        // radii 10 + 10, distance 2: ratio 9
        assert!(check.collides);
        assert_relative_eq!(check.score, 4.5);
    }

    #[test]
    fn distribution_names() {
        assert_eq!("Normal Distribution".parse::<Distribution>().unwrap(), Distribution::Normal);
        assert_eq!("peripheral".parse::<Distribution>().unwrap(), Distribution::Peripheral);
        assert_eq!("Uniform Distribution".parse::<Distribution>().unwrap(), Distribution::Uniform);
        assert!("gaussian".parse::<Distribution>().is_err());
    }

    #[test]
    fn fallback_phases_are_deterministic_spirals() {
        let cfg = PlacementConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let (x, y) = candidate_position(Distribution::Normal, 30, 100.0, &cfg, &mut rng);
        assert_eq!((x, y), (0.0, 0.0));
        let (x, y) = candidate_position(Distribution::Normal, 40, 100.0, &cfg, &mut rng);
        // t = 0.5: radius 45 at angle 5π
        assert_relative_eq!(x, -45.0, epsilon = 1e-9);
        assert_relative_eq!(y, 0.0, epsilon = 1e-9);
        let (x, y) = candidate_position(Distribution::Uniform, 35, 100.0, &cfg, &mut rng);
        // t = 0.25: radius 50 at angle 3.75π
        let angle = 3.75 * PI;
        assert_relative_eq!(x, 50.0 * angle.cos(), epsilon = 1e-9);
        assert_relative_eq!(y, 50.0 * angle.sin(), epsilon = 1e-9);
    }

    #[test]
    fn peripheral_candidates_stay_in_band() {
        let cfg = PlacementConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for attempt in 0..cfg.max_attempts {
            let (x, y) = candidate_position(Distribution::Peripheral, attempt, 100.0, &cfg, &mut rng);
            let d = x.hypot(y);
            assert!((40.0 - 1e-9..=100.0 + 1e-9).contains(&d), "attempt {attempt}: {d}");
        }
    }

    #[test]
    fn uniform_candidates_stay_near_disk() {
        let cfg = PlacementConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        for attempt in 0..cfg.max_attempts {
            let (x, y) = candidate_position(Distribution::Uniform, attempt, 60.0, &cfg, &mut rng);
            // grid cells reach a corner at 2.5 cells plus jitter
            assert!(x.hypot(y) <= 60.0 * 1.3, "attempt {attempt}");
        }
    }

    #[test]
    fn single_feature_places_without_fallback() {
        for distribution in [Distribution::Normal, Distribution::Peripheral, Distribution::Uniform] {
            for seed in 0..20 {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut engine = PlacementEngine::new(100.0, config(distribution));
                let placement = engine.place(10.0, 20.0, &mut rng);
                assert_eq!(placement.outcome, PlacementOutcome::Placed);
                assert_eq!(engine.occupied().len(), 1);
            }
        }
    }

    #[test]
    fn first_feature_commits_true_dimensions() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut engine = PlacementEngine::new(500.0, config(Distribution::Uniform));
        let p = engine.place(10.0, 20.0, &mut rng);
        let committed = engine.occupied().as_slice()[0];
        assert_eq!(committed, BoundingBox::centered(p.x, p.y, 10.0, 20.0));
        assert_eq!(engine.buffer_for(10.0, 20.0), 5.0);
        assert_eq!(engine.buffer_for(40.0, 80.0), 20.0);
    }

    #[test]
    fn successful_placements_do_not_overlap_earlier_boxes() {
        let cfg = PlacementConfig::default();
        for distribution in [Distribution::Normal, Distribution::Peripheral, Distribution::Uniform] {
            let mut rng = StdRng::seed_from_u64(42);
            let mut engine = PlacementEngine::new(150.0, config(distribution));
            let placements: Vec<Placement> = (0..25).map(|_| engine.place(12.0, 8.0, &mut rng)).collect();
            let boxes = engine.occupied().as_slice();
            assert_eq!(boxes.len(), placements.len());
            for (i, placement) in placements.iter().enumerate() {
                if placement.outcome != PlacementOutcome::Placed {
                    continue;
                }
                for earlier in &boxes[..i] {
                    let overlap = boxes[i].overlap_area(earlier).unwrap_or(0.0);
                    assert!(overlap < cfg.negligible_overlap, "{distribution}: box {i} overlaps");
                }
            }
        }
    }

    #[test]
    fn crowded_disk_degrades_to_best_effort() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut engine = PlacementEngine::new(10.0, config(Distribution::Normal));
        let placements: Vec<Placement> = (0..4).map(|_| engine.place(8.0, 8.0, &mut rng)).collect();
        assert!(placements
            .iter()
            .skip(1)
            .any(|p| matches!(p.outcome, PlacementOutcome::BestEffort { .. })));
        assert!(placements.iter().all(|p| p.attempts >= 1));
        assert_eq!(engine.occupied().len(), 4);
    }

    #[test]
    fn sampling_is_seeded_and_with_replacement() {
        let catalog = Catalog::new(vec![model(1.0, 1.0), model(2.0, 2.0)]);
        let a = sample_catalog(&catalog, 10, &mut StdRng::seed_from_u64(4)).unwrap();
        let b = sample_catalog(&catalog, 10, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
        assert!(matches!(
            sample_catalog(&Catalog::default(), 3, &mut StdRng::seed_from_u64(4)),
            Err(Error::EmptyCatalog)
        ));
    }

    #[test]
    fn place_features_is_reproducible() {
        let models = vec![model(10.0, 10.0), model(20.0, 5.0), model(8.0, 8.0)];
        let cfg = config(Distribution::Peripheral);
        let a = place_features(&models, 200.0, &cfg, &mut StdRng::seed_from_u64(77));
        let b = place_features(&models, 200.0, &cfg, &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }
}
