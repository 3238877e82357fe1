//! Local least squares models used as cube outputs by the regression extractors.

use crate::conf::RIDGE;
use faer::{linalg::solvers::Solve, Mat};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn constant(value: f64, n_features: usize) -> Self {
        Self {
            intercept: value,
            coefficients: vec![0.0; n_features],
        }
    }

    /// Fit `y ≈ intercept + coefficients · x` by ridge-stabilised normal equations.
    ///
    /// Falls back to the mean of `y` when there are fewer rows than unknowns or the
    /// solve does not produce finite coefficients.
    pub fn fit(rows: &[&[f64]], y: &[f64]) -> Option<Self> {
        let n = rows.len();
        if n == 0 || n != y.len() {
            return None;
        }
        let d = rows[0].len();
        let mean = y.iter().sum::<f64>() / n as f64;
        if n <= d {
            return Some(Self::constant(mean, d));
        }

        let p = d + 1;
        let design = Mat::<f64>::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { rows[i][j - 1] });
        let target = Mat::<f64>::from_fn(n, 1, |i, _| y[i]);

        let mut gram = design.transpose() * &design;
        for k in 1..p {
            gram[(k, k)] += RIDGE;
        }
        let rhs = design.transpose() * &target;
        let beta = gram.full_piv_lu().solve(rhs);

        let intercept = beta[(0, 0)];
        let coefficients: Vec<f64> = (1..p).map(|k| beta[(k, 0)]).collect();
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Some(Self::constant(mean, d));
        }
        Some(Self {
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x.iter())
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}
