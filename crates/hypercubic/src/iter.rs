//! Point-driven cube growth.
//!
//! Cubes start as single points picked at random among the rows nobody covers yet and grow
//! one slab at a time, along whichever dimension and direction adds the least error. A cube
//! never grows into another one. Once no cube can grow, new seeds are drawn from the rows
//! still uncovered, until none remain or the iteration budget runs out.

use crate::conf::{Target, DEFAULT_SEED};
use crate::dataframe::Dataset;
use crate::error::{ExtractionError, Result};
use crate::extractor::{CubeSearch, Search};
use crate::hypercube::HyperCube;
use crate::interval::Interval;
use crate::point::Point;
use estimators::api::Predictor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterConfig {
    /// Growth step, as a fraction of each feature's range.
    pub min_update: f64,
    /// Seeds drawn each time the cubes stop growing.
    pub n_points: usize,
    pub max_iterations: usize,
    /// Cubes holding fewer training rows are dropped.
    pub min_examples: usize,
    pub threshold: f64,
    pub fill_gaps: bool,
    pub target: Target,
    pub seed: u64,
}

impl Default for IterConfig {
    fn default() -> Self {
        Self {
            min_update: 0.1,
            n_points: 1,
            max_iterations: 600,
            min_examples: 250,
            threshold: 0.1,
            fill_gaps: true,
            target: Target::Constant,
            seed: DEFAULT_SEED,
        }
    }
}

impl IterConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_update > 0.0 && self.min_update <= 1.0) {
            return Err(ExtractionError::InvalidConfig(format!(
                "min_update must be in (0, 1], got {}",
                self.min_update
            )));
        }
        if self.n_points == 0 {
            return Err(ExtractionError::InvalidConfig(
                "n_points must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ExtractionError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ExtractionError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Growing,
    Stable,
    Done,
}

/// A candidate slab added to one side of a cube.
struct Expansion {
    dim: usize,
    interval: Interval,
    error: f64,
}

pub struct Iter {
    config: IterConfig,
}

impl Iter {
    pub fn new(config: IterConfig) -> Self {
        Self { config }
    }

    fn seed_cube(&self, data: &Dataset, row: usize) -> HyperCube {
        let point = Point::new(
            Arc::clone(data.features()),
            data.row(row).to_vec(),
            data.prediction(row),
        );
        let mut cube = HyperCube::from_point(&point, self.config.target);
        cube.update(data, self.config.target);
        cube
    }

    /// Draw up to `n_points` uncovered rows and turn each into a point cube.
    fn reseed(&self, cubes: &mut Vec<HyperCube>, data: &Dataset, rng: &mut StdRng) -> usize {
        let mut uncovered = uncovered_rows(cubes, data);
        uncovered.shuffle(rng);
        let mut added = 0;
        for row in uncovered {
            if added == self.config.n_points {
                break;
            }
            // an earlier seed of this round may already sit on the same coordinates
            if cubes.iter().any(|c| c.contains(data.row(row))) {
                continue;
            }
            cubes.push(self.seed_cube(data, row));
            added += 1;
        }
        added
    }

    /// The lowest-error admissible slab for cube `ci`, if any.
    fn best_expansion(
        &self,
        ci: usize,
        cubes: &[HyperCube],
        data: &Dataset,
        bounds: &HyperCube,
        steps: &[f64],
    ) -> Option<Expansion> {
        let cube = &cubes[ci];
        let mut best: Option<Expansion> = None;
        for (dim, &step) in steps.iter().enumerate() {
            if step <= 0.0 {
                continue;
            }
            let current = *cube.interval(dim);
            let outer = bounds.interval(dim);
            for upward in [false, true] {
                let Some(side) = slab(cubes, ci, dim, upward, current, outer, step) else {
                    continue;
                };
                let mut trial = cube.clone();
                trial.set_interval(dim, side);
                let rows: Vec<usize> = (0..data.len())
                    .filter(|&i| trial.contains(data.row(i)))
                    .collect();
                let error = if rows.is_empty() {
                    0.0
                } else {
                    match cube.error(data, &rows) {
                        Some(e) => e,
                        None => continue,
                    }
                };
                if error > self.config.threshold {
                    continue;
                }
                if best.as_ref().map_or(true, |b| error < b.error) {
                    best = Some(Expansion {
                        dim,
                        interval: current.hull(&side),
                        error,
                    });
                }
            }
        }
        best
    }

    /// Cubes over the rows left uncovered, grouped by the predictor's answer for
    /// classification, then one unbounded cube catching everything else.
    ///
    /// A single residual group would be fit exactly like the catch-all, so it is left to the
    /// catch-all. The catch-all is skipped when a cube already spans `bounds`, since its rule
    /// is unconstrained too.
    fn fill_gaps(&self, cubes: &mut Vec<HyperCube>, data: &Dataset, bounds: &HyperCube) {
        let target = self.config.target;
        let uncovered = uncovered_rows(cubes, data);
        let groups = if target.is_classification() {
            group_by_prediction(&uncovered, data)
        } else {
            vec![uncovered.clone()]
        };
        if groups.len() > 1 {
            for group in groups {
                let intervals = (0..data.n_features())
                    .map(|j| {
                        group
                            .iter()
                            .map(|&i| data.row(i)[j])
                            .fold(Interval::point(data.row(group[0])[j]), |acc, v| acc.expand_to(v))
                    })
                    .collect();
                let mut residual = HyperCube::from_intervals(Arc::clone(data.features()), intervals);
                if residual.update_with(data, &group, target) {
                    cubes.push(residual);
                }
            }
        }

        if cubes.iter().any(|c| spans(c, bounds)) {
            return;
        }
        let fallback_rows: Vec<usize> = if uncovered.is_empty() {
            data.real_indices().collect()
        } else {
            uncovered
        };
        let mut catch_all = HyperCube::new(Arc::clone(data.features()));
        if catch_all.update_with(data, &fallback_rows, target) {
            cubes.push(catch_all);
        }
    }
}

impl CubeSearch for Iter {
    fn name(&self) -> &'static str {
        "ITER"
    }

    fn target(&self) -> Target {
        self.config.target
    }

    fn search(&self, data: &mut Dataset, _predictor: &dyn Predictor) -> Result<Search> {
        let data: &Dataset = data;
        let bounds = HyperCube::surrounding(data);
        let steps: Vec<f64> = bounds
            .intervals()
            .iter()
            .map(|i| if i.is_bounded() { i.width() * self.config.min_update } else { 0.0 })
            .collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut cubes = Vec::new();
        self.reseed(&mut cubes, data, &mut rng);

        let mut state = State::Growing;
        let mut iterations = 0;
        while state != State::Done {
            if iterations == self.config.max_iterations {
                warn!(
                    iterations,
                    cubes = cubes.len(),
                    "ITER stopped at max_iterations before the cubes stabilised"
                );
                break;
            }
            iterations += 1;
            state = match state {
                State::Growing => {
                    let mut grew = false;
                    for ci in 0..cubes.len() {
                        if let Some(expansion) = self.best_expansion(ci, &cubes, data, &bounds, &steps) {
                            cubes[ci].set_interval(expansion.dim, expansion.interval);
                            cubes[ci].update(data, self.config.target);
                            grew = true;
                        }
                    }
                    if grew {
                        State::Growing
                    } else {
                        State::Stable
                    }
                }
                State::Stable => {
                    let added = self.reseed(&mut cubes, data, &mut rng);
                    debug!(iterations, added, cubes = cubes.len(), "ITER reseeded");
                    if added == 0 {
                        State::Done
                    } else {
                        State::Growing
                    }
                }
                State::Done => State::Done,
            };
        }
        let converged = state == State::Done;

        let before = cubes.len();
        cubes.retain(|c| c.count_real(data) >= self.config.min_examples);
        debug!(dropped = before - cubes.len(), "ITER cubes under min_examples");

        if self.config.fill_gaps {
            self.fill_gaps(&mut cubes, data, &bounds);
        }
        Ok(Search {
            cubes,
            converged,
            iterations,
        })
    }
}

fn uncovered_rows(cubes: &[HyperCube], data: &Dataset) -> Vec<usize> {
    data.real_indices()
        .filter(|&i| !cubes.iter().any(|c| c.contains(data.row(i))))
        .collect()
}

/// Rows sharing the same predicted class, classes in increasing order.
fn group_by_prediction(rows: &[usize], data: &Dataset) -> Vec<Vec<usize>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|&a, &b| {
        data.prediction(a)
            .total_cmp(&data.prediction(b))
            .then(a.cmp(&b))
    });
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in sorted {
        match groups.last_mut() {
            Some(group) if data.prediction(group[0]) == data.prediction(i) => group.push(i),
            _ => groups.push(vec![i]),
        }
    }
    groups
}

/// True when `cube` reaches every training bound of `bounds`.
fn spans(cube: &HyperCube, bounds: &HyperCube) -> bool {
    cube.intervals()
        .iter()
        .zip(bounds.intervals())
        .all(|(c, b)| c.low <= b.low && c.high >= b.high)
}

/// The slab of at most `step` next to `current` on one side, clipped to `outer` and to any
/// cube facing `cubes[ci]` across that side.
fn slab(
    cubes: &[HyperCube],
    ci: usize,
    dim: usize,
    upward: bool,
    current: Interval,
    outer: &Interval,
    step: f64,
) -> Option<Interval> {
    let cube = &cubes[ci];
    let facing = cubes.iter().enumerate().filter(|&(k, other)| {
        k != ci
            && cube
                .intervals()
                .iter()
                .zip(other.intervals())
                .enumerate()
                .all(|(j, (a, b))| j == dim || a.intersection(b).is_some())
    });
    let facing: Vec<&Interval> = facing.map(|(_, o)| o.interval(dim)).collect();
    // a facing cube that already owns the meeting value keeps it
    if upward {
        let limit = facing
            .iter()
            .map(|o| o.low)
            .filter(|&low| low >= current.high)
            .fold(outer.high, f64::min);
        let high = (current.high + step).min(limit);
        let shared = facing.iter().any(|o| o.low == high && o.lower_closed);
        (high > current.high).then(|| Interval::new(current.high, high, false, !shared))
    } else {
        let limit = facing
            .iter()
            .map(|o| o.high)
            .filter(|&high| high <= current.low)
            .fold(outer.low, f64::max);
        let low = (current.low - step).max(limit);
        let shared = facing.iter().any(|o| o.high == low && o.upper_closed);
        (low < current.low).then(|| Interval::new(low, current.low, !shared, false))
    }
}
