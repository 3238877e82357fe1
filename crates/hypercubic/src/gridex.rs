//! Grid-based extraction: split the data's bounding box into a regular grid, fit every cell
//! from the predictor and merge neighbouring cells that stay below the error threshold.

use crate::conf::{Target, DEFAULT_SEED};
use crate::dataframe::Dataset;
use crate::error::{ExtractionError, Result};
use crate::extractor::{CubeSearch, Search};
use crate::grid::{Grid, Strategy};
use crate::hypercube::HyperCube;
use estimators::api::Predictor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridExConfig {
    pub grid: Grid,
    /// Cells holding fewer rows are padded with predictor-labelled samples.
    pub min_examples: usize,
    pub threshold: f64,
    pub target: Target,
    pub seed: u64,
}

impl Default for GridExConfig {
    fn default() -> Self {
        Self {
            grid: Grid::new(1, Strategy::fixed(2)),
            min_examples: 250,
            threshold: 0.1,
            target: Target::Constant,
            seed: DEFAULT_SEED,
        }
    }
}

impl GridExConfig {
    pub fn new(grid: Grid, threshold: f64) -> Self {
        Self {
            grid,
            threshold,
            ..Self::default()
        }
    }

    pub fn with_min_examples(mut self, min_examples: usize) -> Self {
        self.min_examples = min_examples;
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.iterations == 0 {
            return Err(ExtractionError::InvalidConfig(
                "grid needs at least one iteration".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ExtractionError::InvalidConfig(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        match &self.grid.strategy {
            Strategy::Fixed(0) => Err(ExtractionError::InvalidConfig(
                "fixed strategy needs at least one bin".to_string(),
            )),
            Strategy::Adaptive { bands, .. } if bands.iter().any(|(_, n)| *n == 0) => Err(
                ExtractionError::InvalidConfig("adaptive bands need at least one bin".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

pub struct GridEx {
    config: GridExConfig,
}

impl GridEx {
    pub fn new(config: GridExConfig) -> Self {
        Self { config }
    }

    /// Split every frontier cube, drop cells without real rows, pad and fit the rest.
    fn refine(
        &self,
        frontier: &[HyperCube],
        iteration: usize,
        data: &mut Dataset,
        predictor: &dyn Predictor,
    ) -> Result<Vec<HyperCube>> {
        let cells: Vec<HyperCube> = frontier
            .iter()
            .flat_map(|cube| self.config.grid.split(cube))
            .collect();
        let shared: &Dataset = data;
        let mut cells: Vec<(HyperCube, Vec<usize>)> = cells
            .into_par_iter()
            .map(|cell| {
                let idx = cell.indices(shared);
                (cell, idx)
            })
            .filter(|(cell, _)| cell.count_real(shared) > 0)
            .collect();

        let min_examples = self.config.min_examples;
        let base_seed = self
            .config
            .seed
            .wrapping_add((iteration as u64).wrapping_mul(1_000_003));
        let samples: Vec<Vec<Vec<f64>>> = cells
            .par_iter()
            .enumerate()
            .map(|(i, (cell, idx))| {
                let missing = min_examples.saturating_sub(idx.len());
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
                cell.create_samples(missing, &mut rng)
            })
            .collect();

        let counts: Vec<usize> = samples.iter().map(|s| s.len()).collect();
        let added = data.push_synthetic(samples.into_iter().flatten().collect(), predictor)?;
        let mut next = added.start;
        for ((_, idx), count) in cells.iter_mut().zip(counts) {
            idx.extend(next..next + count);
            next += count;
        }

        let target = self.config.target;
        let shared: &Dataset = data;
        cells.par_iter_mut().for_each(|(cell, idx)| {
            cell.update_with(shared, idx, target);
        });
        debug!(
            iteration,
            cells = cells.len(),
            synthetic = added.len(),
            "grid refinement"
        );
        Ok(cells.into_iter().map(|(cell, _)| cell).collect())
    }
}

impl CubeSearch for GridEx {
    fn name(&self) -> &'static str {
        match self.config.target {
            Target::Regression => "GridREx",
            _ => "GridEx",
        }
    }

    fn target(&self) -> Target {
        self.config.target
    }

    fn search(&self, data: &mut Dataset, predictor: &dyn Predictor) -> Result<Search> {
        let mut frontier = vec![HyperCube::surrounding(data)];
        let mut finished = Vec::new();
        for iteration in 0..self.config.grid.iterations {
            let cells = self.refine(&frontier, iteration, data, predictor)?;
            let last = iteration + 1 == self.config.grid.iterations;
            frontier.clear();
            for cell in cells {
                if last || cell.diversity() <= self.config.threshold {
                    finished.push(cell);
                } else {
                    frontier.push(cell);
                }
            }
            if frontier.is_empty() {
                break;
            }
        }
        let cubes = merge_adjacent(finished, data, self.config.target, self.config.threshold);
        Ok(Search {
            cubes,
            converged: true,
            iterations: self.config.grid.iterations,
        })
    }
}

/// Repeatedly replace the pair of adjacent cubes whose union fits best, as long as the
/// union's diversity stays within `threshold`.
pub fn merge_adjacent(
    mut cubes: Vec<HyperCube>,
    data: &Dataset,
    target: Target,
    threshold: f64,
) -> Vec<HyperCube> {
    loop {
        let pairs: Vec<(usize, usize)> = (0..cubes.len())
            .flat_map(|i| ((i + 1)..cubes.len()).map(move |j| (i, j)))
            .filter(|&(i, j)| cubes[i].adjacent_dimension(&cubes[j]).is_some())
            .collect();
        let best = pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let mut merged = cubes[i].merge(&cubes[j]);
                let idx = merged.indices(data);
                if !merged.update_with(data, &idx, target) || merged.diversity() > threshold {
                    return None;
                }
                Some((merged.diversity(), i, j, merged))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then((a.1, a.2).cmp(&(b.1, b.2))));

        match best {
            Some((diversity, i, j, merged)) => {
                debug!(i, j, diversity, "merging adjacent cubes");
                cubes[i] = merged;
                cubes.remove(j);
            }
            None => return cubes,
        }
    }
}
