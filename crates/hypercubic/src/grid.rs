use crate::hypercube::HyperCube;
use crate::interval::Interval;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How many bins each feature dimension is split into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Strategy {
    /// Every dimension gets the same number of bins.
    Fixed(usize),
    /// Importance bands: a feature whose normalised importance reaches a band's threshold
    /// gets that band's bin count (the highest band reached wins, otherwise one bin).
    Adaptive {
        ranking: Vec<(String, f64)>,
        bands: Vec<(f64, usize)>,
    },
}

impl Strategy {
    pub fn fixed(n: usize) -> Self {
        Strategy::Fixed(n.max(1))
    }

    pub fn adaptive(ranking: Vec<(String, f64)>, mut bands: Vec<(f64, usize)>) -> Self {
        bands.sort_by(|a, b| a.0.total_cmp(&b.0));
        Strategy::Adaptive { ranking, bands }
    }

    /// Adaptive strategy with the two default bands `(0.33, 2)` and `(0.67, 3)`.
    pub fn adaptive_default(ranking: Vec<(String, f64)>) -> Self {
        Self::adaptive(ranking, vec![(0.33, 2), (0.67, 3)])
    }

    pub fn bins(&self, feature: &str) -> usize {
        match self {
            Strategy::Fixed(n) => *n,
            Strategy::Adaptive { ranking, bands } => {
                let Some(importance) = ranking
                    .iter()
                    .find(|(name, _)| name == feature)
                    .map(|(_, imp)| *imp)
                else {
                    return 1;
                };
                bands
                    .iter()
                    .rev()
                    .find(|(threshold, _)| importance >= *threshold)
                    .map(|(_, n)| (*n).max(1))
                    .unwrap_or(1)
            }
        }
    }

    /// Number of cells one split of a cube over `columns` produces.
    pub fn partition_number(&self, columns: &[String]) -> usize {
        columns
            .iter()
            .map(|c| self.bins(c))
            .fold(1usize, |acc, n| acc.saturating_mul(n))
    }

    /// Two strategies are equal when they assign the same bins to every column.
    pub fn equals(&self, other: &Strategy, columns: &[String]) -> bool {
        columns.iter().all(|c| self.bins(c) == other.bins(c))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Fixed(n) => write!(f, "Fixed ({})", n),
            Strategy::Adaptive { ranking, .. } => {
                let parts = ranking
                    .iter()
                    .map(|(name, _)| format!("{}: {}", name, self.bins(name)))
                    .join(", ");
                write!(f, "Adaptive ({})", parts)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub iterations: usize,
    pub strategy: Strategy,
}

impl Grid {
    pub fn new(iterations: usize, strategy: Strategy) -> Self {
        Self {
            iterations,
            strategy,
        }
    }

    pub fn partition_number(&self, columns: &[String]) -> usize {
        self.strategy.partition_number(columns)
    }

    /// Cartesian product of the per-dimension bins of `cube`.
    pub fn split(&self, cube: &HyperCube) -> Vec<HyperCube> {
        let features = Arc::clone(cube.features());
        cube.dimensions()
            .map(|(name, interval)| interval.bins(self.strategy.bins(name)))
            .multi_cartesian_product()
            .map(|intervals: Vec<Interval>| HyperCube::from_intervals(Arc::clone(&features), intervals))
            .collect()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid ({} iterations, {})", self.iterations, self.strategy)
    }
}
