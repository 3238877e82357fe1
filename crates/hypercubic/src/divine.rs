//! Bottom-up region growth for classification.
//!
//! Rows whose neighbourhood is not unanimous are dropped first. Cubes then grow from random
//! seed rows by absorbing the closest remaining row of the same class, tolerating a bounded
//! number of rows of other classes before giving up.
//!
//! Only cubes with a positive raw volume are kept. Rows that never leave a flat cube behind,
//! such as classes lying on a line or a plane, stay uncovered and predict NaN.

use crate::conf::{Target, DEFAULT_SEED, EPSILON};
use crate::dataframe::Dataset;
use crate::error::{ExtractionError, Result};
use crate::extractor::{CubeSearch, Search};
use crate::hypercube::HyperCube;
use crate::neighbors::KDTree;
use crate::point::Point;
use estimators::api::Predictor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DivineConfig {
    /// Neighbours (the row itself included) that must agree for a row to be kept.
    pub k: usize,
    pub patience: usize,
    /// Measure closeness to the cube centre instead of to its nearest corner.
    pub close_to_center: bool,
    pub seed: u64,
}

impl Default for DivineConfig {
    fn default() -> Self {
        Self {
            k: 5,
            patience: 15,
            close_to_center: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl DivineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(ExtractionError::InvalidConfig("k must be at least 1".to_string()));
        }
        if self.patience == 0 {
            return Err(ExtractionError::InvalidConfig(
                "patience must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Real rows whose `k` nearest neighbours, themselves included, share one predicted class.
pub fn denoise(data: &Dataset, k: usize) -> Vec<usize> {
    let real: Vec<usize> = data.real_indices().collect();
    let tree = KDTree::new(real.iter().map(|&i| data.row(i)).collect());
    real.iter()
        .copied()
        .filter(|&i| {
            let class = data.prediction(i);
            tree.k_nearest(data.row(i), k)
                .iter()
                .all(|&(n, _)| same_class(data.prediction(real[n]), class))
        })
        .collect()
}

fn same_class(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

pub struct Divine {
    config: DivineConfig,
}

impl Divine {
    pub fn new(config: DivineConfig) -> Self {
        Self { config }
    }

    /// Position in `pool` of the row closest to `cube`.
    fn closest(&self, cube: &HyperCube, pool: &[usize], data: &Dataset) -> Option<usize> {
        let tree = KDTree::new(pool.iter().map(|&i| data.row(i)).collect());
        if self.config.close_to_center {
            return tree.nearest(&cube.center()).map(|(pos, _)| pos);
        }
        cube.corners()
            .iter()
            .filter_map(|corner| tree.nearest(corner))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(pos, _)| pos)
    }

    /// Grow one cube from `seed`. Rows of other classes met on the way are set aside and
    /// returned to `pool` once growth stops.
    fn grow(&self, seed: usize, pool: &mut Vec<usize>, data: &Dataset) -> HyperCube {
        let point = Point::new(
            Arc::clone(data.features()),
            data.row(seed).to_vec(),
            data.prediction(seed),
        );
        let class = point.output();
        let mut cube = HyperCube::from_point(&point, Target::Classification);
        let mut set_aside = Vec::new();
        let mut patience = self.config.patience;

        while patience > 0 {
            let Some(pos) = self.closest(&cube, pool, data) else {
                break;
            };
            let row = pool.swap_remove(pos);
            if same_class(data.prediction(row), class) {
                let candidate = Point::new(
                    Arc::clone(data.features()),
                    data.row(row).to_vec(),
                    data.prediction(row),
                );
                cube.merge_with_point(&candidate);
                pool.retain(|&i| !cube.contains(data.row(i)));
            } else {
                patience -= 1;
                set_aside.push(row);
            }
        }
        pool.extend(set_aside);
        cube
    }
}

impl CubeSearch for Divine {
    fn name(&self) -> &'static str {
        "DiViNE"
    }

    fn target(&self) -> Target {
        Target::Classification
    }

    fn search(&self, data: &mut Dataset, _predictor: &dyn Predictor) -> Result<Search> {
        let data: &Dataset = data;
        let mut pool = denoise(data, self.config.k);
        debug!(
            kept = pool.len(),
            dropped = data.n_real() - pool.len(),
            "DiViNE neighbourhood filter"
        );
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut cubes: Vec<HyperCube> = Vec::new();
        let mut seeds = 0;

        while !pool.is_empty() {
            let seed = pool.swap_remove(rng.random_range(0..pool.len()));
            seeds += 1;
            let mut cube = self.grow(seed, &mut pool, data);
            if cube.volume() > 0.0 {
                cube.update(data, Target::Classification);
                cubes.push(cube);
            }
        }

        // stable sort: equally ambiguous cubes keep their creation order
        cubes.sort_by(|a, b| a.diversity().total_cmp(&b.diversity()));
        Ok(Search {
            cubes,
            converged: true,
            iterations: seeds,
        })
    }
}
