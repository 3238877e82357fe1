//! A hypercube holds one interval per feature dimension and the output predicted inside it.
//! It is responsible for:
//! * Evaluating rows (single, batched, or a whole DataFrame) against its intervals
//! * Fitting its output from the predictor's answers over the rows it contains
//! * The geometric operations used by the extractors (split, merge, corners, distances)

use crate::conf::*;
use crate::dataframe::{Dataset, HyperCubeDataFrameExt};
use crate::error::Result;
use crate::interval::Interval;
use crate::point::Point;
use crate::regression::LinearModel;
use itertools::Itertools;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CubeOutput {
    Constant(f64),
    Linear(LinearModel),
    Class(f64),
}

impl CubeOutput {
    pub fn value_at(&self, row: &[f64]) -> f64 {
        match self {
            CubeOutput::Constant(v) | CubeOutput::Class(v) => *v,
            CubeOutput::Linear(model) => model.predict(row),
        }
    }

    /// The output as a plain number, `None` for local models.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            CubeOutput::Constant(v) | CubeOutput::Class(v) => Some(*v),
            CubeOutput::Linear(_) => None,
        }
    }

    fn deviation(&self, row: &[f64], prediction: f64) -> f64 {
        match self {
            CubeOutput::Class(label) => {
                if (label - prediction).abs() <= EPSILON {
                    0.0
                } else {
                    1.0
                }
            }
            _ => (self.value_at(row) - prediction).abs(),
        }
    }
}

impl fmt::Display for CubeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CubeOutput::Constant(v) => write!(f, "{:.4}", v),
            CubeOutput::Class(v) => write!(f, "{}", v),
            CubeOutput::Linear(model) => {
                write!(f, "{:.4}", model.intercept)?;
                for (i, c) in model.coefficients.iter().enumerate() {
                    write!(f, " + {:.4} * x{}", c, i)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct HyperCube {
    features: Arc<[String]>,
    intervals: Vec<Interval>,
    output: Option<CubeOutput>,
    diversity: f64,
    count: usize,
}

impl PartialEq for HyperCube {
    fn eq(&self, other: &Self) -> bool {
        self.features == other.features
            && self.intervals == other.intervals
            && self.output == other.output
    }
}

impl HyperCube {
    /// Unconstrained cube: every feature spans `(-inf, +inf)`.
    pub fn new(features: Arc<[String]>) -> Self {
        let intervals = vec![Interval::unbounded(); features.len()];
        Self::from_intervals(features, intervals)
    }

    pub fn from_intervals(features: Arc<[String]>, intervals: Vec<Interval>) -> Self {
        assert_eq!(features.len(), intervals.len());
        Self {
            features,
            intervals,
            output: None,
            diversity: f64::INFINITY,
            count: 0,
        }
    }

    /// Closed cube spanning the real rows of `data` on every feature.
    pub fn surrounding(data: &Dataset) -> Self {
        let intervals = data
            .bounds()
            .into_iter()
            .map(|(lo, hi)| {
                if lo <= hi {
                    Interval::closed(lo, hi)
                } else {
                    Interval::unbounded()
                }
            })
            .collect();
        Self::from_intervals(Arc::clone(data.features()), intervals)
    }

    /// Zero-width cube sitting on `point`, with the point's output.
    pub fn from_point(point: &Point, target: Target) -> Self {
        let intervals = point.values().iter().map(|&v| Interval::point(v)).collect();
        let mut cube = Self::from_intervals(Arc::clone(point.names()), intervals);
        cube.output = Some(match target {
            Target::Classification => CubeOutput::Class(point.output()),
            Target::Regression => {
                CubeOutput::Linear(LinearModel::constant(point.output(), point.values().len()))
            }
            Target::Constant => CubeOutput::Constant(point.output()),
        });
        cube.diversity = 0.0;
        cube.count = 1;
        cube
    }

    pub fn features(&self) -> &Arc<[String]> {
        &self.features
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn interval(&self, dim: usize) -> &Interval {
        &self.intervals[dim]
    }

    pub fn get(&self, name: &str) -> Option<&Interval> {
        self.features
            .iter()
            .position(|f| f == name)
            .map(|j| &self.intervals[j])
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &Interval)> {
        self.features
            .iter()
            .map(|f| f.as_str())
            .zip(self.intervals.iter())
    }

    pub fn set_interval(&mut self, dim: usize, interval: Interval) {
        self.intervals[dim] = interval;
    }

    pub fn output(&self) -> Option<&CubeOutput> {
        self.output.as_ref()
    }

    pub fn set_output(&mut self, output: CubeOutput) {
        self.output = Some(output);
    }

    /// Fit quality of the current output over the rows it was fit on.
    pub fn diversity(&self) -> f64 {
        self.diversity
    }

    /// Rows used by the last successful update.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn contains(&self, row: &[f64]) -> bool {
        self.intervals
            .iter()
            .zip(row.iter())
            .all(|(interval, &x)| interval.contains(x))
    }

    /// Row mask over every row of `data`, synthetic ones included.
    pub fn filter_indices(&self, data: &Dataset) -> Vec<bool> {
        data.rows().map(|row| self.contains(row)).collect()
    }

    /// Positions in `candidates` whose rows lie inside the cube.
    pub fn select<'a, I>(&self, data: &Dataset, candidates: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'a usize>,
    {
        candidates
            .into_iter()
            .copied()
            .filter(|&i| self.contains(data.row(i)))
            .collect()
    }

    /// Indices of every row of `data` inside the cube.
    pub fn indices(&self, data: &Dataset) -> Vec<usize> {
        (0..data.len())
            .filter(|&i| self.contains(data.row(i)))
            .collect()
    }

    /// Number of real (non synthetic) rows of `data` inside the cube.
    pub fn count_real(&self, data: &Dataset) -> usize {
        data.real_indices()
            .filter(|&i| self.contains(data.row(i)))
            .count()
    }

    /// Build a boolean mask for the rows of a feature frame.
    pub fn match_dataframe_return_mask(&self, df: &DataFrame) -> Result<Vec<bool>> {
        let mut combined_mask = vec![true; df.height()];
        for (name, interval) in self.dimensions() {
            let column = df.numeric_column(name)?;
            for (acc, x) in combined_mask.iter_mut().zip(column.iter()) {
                *acc = *acc && interval.contains(*x);
            }
        }
        Ok(combined_mask)
    }

    /// Product of the interval widths.
    pub fn volume(&self) -> f64 {
        self.intervals.iter().map(|i| i.width()).product()
    }

    /// Volume with every width floored at `MIN_WIDTH`.
    pub fn padded_volume(&self) -> f64 {
        self.intervals
            .iter()
            .map(|i| i.width().max(MIN_WIDTH))
            .product()
    }

    pub fn center(&self) -> Vec<f64> {
        self.intervals.iter().map(|i| i.center()).collect()
    }

    /// The `2^d` extreme points of the cube.
    pub fn corners(&self) -> Vec<Vec<f64>> {
        self.intervals
            .iter()
            .map(|i| [i.low, i.high])
            .multi_cartesian_product()
            .collect()
    }

    /// Euclidean distance from `row` to the closest point of the cube.
    pub fn distance(&self, row: &[f64]) -> f64 {
        self.intervals
            .iter()
            .zip(row.iter())
            .map(|(i, &x)| i.distance(x).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Expand every interval just enough to include `point`.
    pub fn merge_with_point(&mut self, point: &Point) {
        for (interval, &x) in self.intervals.iter_mut().zip(point.values().iter()) {
            *interval = interval.expand_to(x);
        }
    }

    /// Smallest cube containing both cubes. The output is left undefined.
    pub fn merge(&self, other: &HyperCube) -> HyperCube {
        let intervals = self
            .intervals
            .iter()
            .zip(other.intervals.iter())
            .map(|(a, b)| a.hull(b))
            .collect();
        HyperCube::from_intervals(Arc::clone(&self.features), intervals)
    }

    pub fn intersection(&self, other: &HyperCube) -> Option<HyperCube> {
        let intervals = self
            .intervals
            .iter()
            .zip(other.intervals.iter())
            .map(|(a, b)| a.intersection(b))
            .collect::<Option<Vec<_>>>()?;
        Some(HyperCube::from_intervals(Arc::clone(&self.features), intervals))
    }

    /// True when the interiors overlap on every dimension.
    pub fn overlaps(&self, other: &HyperCube) -> bool {
        self.intervals
            .iter()
            .zip(other.intervals.iter())
            .all(|(a, b)| a.overlaps(b) || (a.width() == 0.0 && b.contains(a.low)))
    }

    /// The dimension along which the two cubes share a face, if they do.
    ///
    /// Adjacent cubes have identical bounds everywhere except one dimension,
    /// where one ends exactly where the other starts.
    pub fn adjacent_dimension(&self, other: &HyperCube) -> Option<usize> {
        let mut touching = None;
        for (j, (a, b)) in self.intervals.iter().zip(other.intervals.iter()).enumerate() {
            if a.same_bounds(b) {
                continue;
            }
            if touching.is_some() || !(a.touches_below(b) || b.touches_below(a)) {
                return None;
            }
            touching = Some(j);
        }
        touching
    }

    /// Split along `dim` at `value`; the lower part is open at `value`.
    pub fn split(&self, dim: usize, value: f64) -> (HyperCube, HyperCube) {
        let (left, right) = self.intervals[dim].split(value);
        let mut lower = HyperCube::from_intervals(Arc::clone(&self.features), self.intervals.clone());
        let mut upper = lower.clone();
        lower.intervals[dim] = left;
        upper.intervals[dim] = right;
        (lower, upper)
    }

    /// Refit the output from the predictions of every row of `data` inside the cube.
    ///
    /// Returns `false` and keeps the previous output when the cube holds no rows.
    pub fn update(&mut self, data: &Dataset, target: Target) -> bool {
        let idx = self.indices(data);
        self.update_with(data, &idx, target)
    }

    /// Refit the output from the predictions of the given rows.
    pub fn update_with(&mut self, data: &Dataset, idx: &[usize], target: Target) -> bool {
        match fit_output(data, idx, target) {
            Some((output, diversity)) => {
                self.output = Some(output);
                self.diversity = diversity;
                self.count = idx.len();
                true
            }
            None => false,
        }
    }

    /// Mean deviation between the predictor and this cube's output over `idx`.
    ///
    /// `None` when the cube has no output yet or `idx` is empty.
    pub fn error(&self, data: &Dataset, idx: &[usize]) -> Option<f64> {
        let output = self.output.as_ref()?;
        if idx.is_empty() {
            return None;
        }
        let total: f64 = idx
            .iter()
            .map(|&i| output.deviation(data.row(i), data.prediction(i)))
            .sum();
        Some(total / idx.len() as f64)
    }

    pub fn predict_row(&self, row: &[f64]) -> Option<f64> {
        self.output.as_ref().map(|o| o.value_at(row))
    }

    /// `n` points drawn uniformly inside the cube.
    pub fn create_samples(&self, n: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| {
                self.intervals
                    .iter()
                    .map(|i| {
                        if i.is_bounded() && i.high > i.low {
                            rng.random_range(i.low..i.high)
                        } else if i.is_bounded() {
                            i.low
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Fit an output of the requested kind over `idx`, returning it with its diversity.
pub fn fit_output(data: &Dataset, idx: &[usize], target: Target) -> Option<(CubeOutput, f64)> {
    if idx.is_empty() {
        return None;
    }
    let predictions = data.predictions_at(idx);
    let n = predictions.len() as f64;
    let output = match target {
        Target::Constant => CubeOutput::Constant(predictions.iter().sum::<f64>() / n),
        Target::Classification => {
            let mut sorted = predictions.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let (_, label) = sorted
                .iter()
                .dedup_with_count()
                .fold((0usize, sorted[0]), |best, (count, &value)| {
                    if count > best.0 {
                        (count, value)
                    } else {
                        best
                    }
                });
            CubeOutput::Class(label)
        }
        Target::Regression => {
            let rows: Vec<&[f64]> = idx.iter().map(|&i| data.row(i)).collect();
            CubeOutput::Linear(LinearModel::fit(&rows, &predictions)?)
        }
    };
    let diversity = idx
        .iter()
        .zip(predictions.iter())
        .map(|(&i, &p)| output.deviation(data.row(i), p))
        .sum::<f64>()
        / n;
    Some((output, diversity))
}

impl fmt::Display for HyperCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HyperCube{{ ")?;
        let mut first = true;
        for (name, interval) in self.dimensions() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, interval)?;
            first = false;
        }
        write!(f, " }}")?;
        if let Some(output) = &self.output {
            write!(f, " -> {}", output)?;
        }
        Ok(())
    }
}
