//! Permutation-based feature importance, used to build adaptive grid strategies.

use crate::dataframe::{rows_to_frame, HyperCubeDataFrameExt};
use crate::error::{ExtractionError, Result};
use estimators::api::Predictor;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

pub struct FeatureRanker {
    features: Vec<String>,
    repeats: usize,
    seed: u64,
    scores: Vec<f64>,
}

impl FeatureRanker {
    pub fn new(features: Vec<String>, seed: u64) -> Self {
        Self {
            features,
            repeats: 3,
            seed,
            scores: Vec::new(),
        }
    }

    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats.max(1);
        self
    }

    /// Score each feature by how much the predictor's output moves when that
    /// feature's column is shuffled. `x` holds the feature columns only.
    pub fn fit(mut self, predictor: &dyn Predictor, x: &DataFrame) -> Result<Self> {
        if x.height() == 0 {
            return Err(ExtractionError::EmptyDataFrame);
        }
        let rows = x.numeric_rows(&self.features)?;
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let baseline = predictor.predict(&rows_to_frame(&self.features, &refs)?)?;

        let scores = (0..self.features.len())
            .into_par_iter()
            .map(|j| -> Result<f64> {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(j as u64));
                let mut total = 0.0;
                for _ in 0..self.repeats {
                    let mut column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
                    column.shuffle(&mut rng);
                    let permuted: Vec<Vec<f64>> = rows
                        .iter()
                        .zip(column.iter())
                        .map(|(r, &v)| {
                            let mut r = r.clone();
                            r[j] = v;
                            r
                        })
                        .collect();
                    let refs: Vec<&[f64]> = permuted.iter().map(|r| r.as_slice()).collect();
                    let predicted = predictor.predict(&rows_to_frame(&self.features, &refs)?)?;
                    total += predicted
                        .iter()
                        .zip(baseline.iter())
                        .map(|(a, b)| (a - b).abs())
                        .sum::<f64>()
                        / baseline.len() as f64;
                }
                Ok(total / self.repeats as f64)
            })
            .collect::<Result<Vec<f64>>>()?;

        debug!(?scores, "feature permutation scores");
        self.scores = scores;
        Ok(self)
    }

    /// Features with importances scaled so the most important one scores 1,
    /// most important first. Ties keep column order.
    pub fn rankings(&self) -> Vec<(String, f64)> {
        let max = self.scores.iter().cloned().fold(0.0_f64, f64::max);
        let mut ranked: Vec<(String, f64)> = self
            .features
            .iter()
            .cloned()
            .zip(self.scores.iter().map(|s| if max > 0.0 { s / max } else { 0.0 }))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}
