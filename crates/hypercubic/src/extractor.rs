//! The extraction contract shared by every algorithm, and the extractor that runs them.

use crate::cluster::{ClusterConfig, ClusterExtractor, ClusterSelection};
use crate::conf::Target;
use crate::dataframe::{Dataset, HyperCubeDataFrameExt};
use crate::divine::{Divine, DivineConfig};
use crate::error::{ExtractionError, Result};
use crate::gridex::{GridEx, GridExConfig};
use crate::hypercube::HyperCube;
use crate::iter::{Iter, IterConfig};
use crate::schema::{Discretization, Normalization};
use crate::theory::Theory;
use estimators::api::Predictor;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Cubes produced by one run of a search, in rule order.
pub struct Search {
    pub cubes: Vec<HyperCube>,
    pub converged: bool,
    pub iterations: usize,
}

/// The part each algorithm provides: turn labelled rows into ordered cubes.
pub trait CubeSearch {
    fn name(&self) -> &'static str;

    fn target(&self) -> Target;

    /// `data` may grow with synthetic rows; they are labelled through `predictor`.
    fn search(&self, data: &mut Dataset, predictor: &dyn Predictor) -> Result<Search>;
}

/// The closed set of extraction algorithms, each with its configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Algorithm {
    GridEx(GridExConfig),
    /// GridEx with local linear models as outputs.
    GridREx(GridExConfig),
    Iter(IterConfig),
    Cream(ClusterConfig),
    Creepy(ClusterConfig),
    Divine(DivineConfig),
}

impl Algorithm {
    pub fn validate(&self) -> Result<()> {
        match self {
            Algorithm::GridEx(c) | Algorithm::GridREx(c) => c.validate(),
            Algorithm::Iter(c) => c.validate(),
            Algorithm::Cream(c) | Algorithm::Creepy(c) => c.validate(),
            Algorithm::Divine(c) => c.validate(),
        }
    }

    pub fn searcher(&self) -> Box<dyn CubeSearch> {
        match self {
            Algorithm::GridEx(c) => Box::new(GridEx::new(c.clone())),
            Algorithm::GridREx(c) => Box::new(GridEx::new(c.clone().with_target(Target::Regression))),
            Algorithm::Iter(c) => Box::new(Iter::new(c.clone())),
            Algorithm::Cream(c) => Box::new(ClusterExtractor::new(ClusterConfig {
                selection: ClusterSelection::MinError,
                ..c.clone()
            })),
            Algorithm::Creepy(c) => Box::new(ClusterExtractor::new(ClusterConfig {
                selection: ClusterSelection::MaxVolume,
                ..c.clone()
            })),
            Algorithm::Divine(c) => Box::new(Divine::new(c.clone())),
        }
    }
}

/// Summary of the last extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub algorithm: String,
    pub target: Target,
    pub n_cubes: usize,
    /// False when an iteration budget stopped the search early.
    pub converged: bool,
    pub iterations: usize,
    /// Training rows no cube contains.
    pub uncovered: usize,
    pub synthetic_rows: usize,
}

pub trait Extractor {
    fn extract(&mut self, df: &DataFrame) -> Result<Theory>;

    /// One value per row of `df`, NaN where no rule applies.
    fn predict(&self, df: &DataFrame) -> Result<Vec<f64>>;

    fn n_rules(&self) -> usize;

    /// Feature columns seen by the last extraction.
    fn feature_names(&self) -> Result<&[String]>;

    /// `(predicted, reference)` pairs over the rows with a defined prediction. The reference
    /// is `predictor`'s output when given, otherwise the last column of `df`.
    fn scored_pairs(
        &self,
        df: &DataFrame,
        predictor: Option<&dyn Predictor>,
    ) -> Result<Vec<(f64, f64)>> {
        let predicted = self.predict(df)?;
        let reference = match predictor {
            Some(p) => {
                let features: Vec<PlSmallStr> = self
                    .feature_names()?
                    .iter()
                    .map(|f| PlSmallStr::from_str(f))
                    .collect();
                p.predict(&df.select(features)?)?
            }
            None => {
                let features = self.feature_names()?;
                let output = df
                    .output_name()
                    .filter(|name| !features.contains(name))
                    .ok_or_else(|| {
                        ExtractionError::InvalidInput(
                            "no output column to score against".to_string(),
                        )
                    })?;
                df.numeric_column(&output)?
            }
        };
        Ok(predicted
            .into_iter()
            .zip(reference)
            .filter(|(p, r)| !p.is_nan() && !r.is_nan())
            .collect())
    }

    /// Mean absolute error over rows with a defined prediction; NaN if there are none.
    fn mae(&self, df: &DataFrame, predictor: Option<&dyn Predictor>) -> Result<f64> {
        let pairs = self.scored_pairs(df, predictor)?;
        Ok(mean(pairs.iter().map(|(p, r)| (p - r).abs()), pairs.len()))
    }

    fn mse(&self, df: &DataFrame, predictor: Option<&dyn Predictor>) -> Result<f64> {
        let pairs = self.scored_pairs(df, predictor)?;
        Ok(mean(pairs.iter().map(|(p, r)| (p - r).powi(2)), pairs.len()))
    }

    fn r2(&self, df: &DataFrame, predictor: Option<&dyn Predictor>) -> Result<f64> {
        let pairs = self.scored_pairs(df, predictor)?;
        if pairs.is_empty() {
            return Ok(f64::NAN);
        }
        let mean_ref = mean(pairs.iter().map(|(_, r)| *r), pairs.len());
        let ss_res: f64 = pairs.iter().map(|(p, r)| (r - p).powi(2)).sum();
        let ss_tot: f64 = pairs.iter().map(|(_, r)| (r - mean_ref).powi(2)).sum();
        if ss_tot == 0.0 {
            return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_res / ss_tot)
    }

    /// Fraction of rows with a defined prediction equal to the reference.
    fn accuracy(&self, df: &DataFrame, predictor: Option<&dyn Predictor>) -> Result<f64> {
        let pairs = self.scored_pairs(df, predictor)?;
        Ok(mean(
            pairs.iter().map(|(p, r)| if p == r { 1.0 } else { 0.0 }),
            pairs.len(),
        ))
    }
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    values.sum::<f64>() / n as f64
}

/// Runs one [`Algorithm`] against a borrowed predictor and keeps the resulting cubes.
pub struct HyperCubeExtractor<'p> {
    predictor: &'p dyn Predictor,
    algorithm: Algorithm,
    discretization: Option<Discretization>,
    normalization: Option<Normalization>,
    cubes: Vec<HyperCube>,
    features: Option<Arc<[String]>>,
    bounds: Option<HyperCube>,
    theory: Option<Theory>,
    report: Option<ExtractionReport>,
}

impl<'p> HyperCubeExtractor<'p> {
    pub fn new(predictor: &'p dyn Predictor, algorithm: Algorithm) -> Self {
        Self {
            predictor,
            algorithm,
            discretization: None,
            normalization: None,
            cubes: Vec::new(),
            features: None,
            bounds: None,
            theory: None,
            report: None,
        }
    }

    pub fn gridex(predictor: &'p dyn Predictor, config: GridExConfig) -> Self {
        Self::new(predictor, Algorithm::GridEx(config))
    }

    pub fn gridrex(predictor: &'p dyn Predictor, config: GridExConfig) -> Self {
        Self::new(predictor, Algorithm::GridREx(config))
    }

    pub fn iter(predictor: &'p dyn Predictor, config: IterConfig) -> Self {
        Self::new(predictor, Algorithm::Iter(config))
    }

    pub fn cream(predictor: &'p dyn Predictor, config: ClusterConfig) -> Self {
        Self::new(predictor, Algorithm::Cream(config))
    }

    pub fn creepy(predictor: &'p dyn Predictor, config: ClusterConfig) -> Self {
        Self::new(predictor, Algorithm::Creepy(config))
    }

    pub fn divine(predictor: &'p dyn Predictor, config: DivineConfig) -> Self {
        Self::new(predictor, Algorithm::Divine(config))
    }

    pub fn with_discretization(mut self, discretization: Discretization) -> Self {
        self.discretization = Some(discretization);
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = Some(normalization);
        self
    }

    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Final cubes in rule order.
    pub fn cubes(&self) -> &[HyperCube] {
        &self.cubes
    }

    /// Closed cube spanning the training rows of the last extraction.
    pub fn bounds(&self) -> Option<&HyperCube> {
        self.bounds.as_ref()
    }

    pub fn theory(&self) -> Option<&Theory> {
        self.theory.as_ref()
    }

    pub fn report(&self) -> Option<&ExtractionReport> {
        self.report.as_ref()
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.cubes
            .iter()
            .find(|c| c.contains(row))
            .and_then(|c| c.predict_row(row))
            .unwrap_or(f64::NAN)
    }
}

impl Extractor for HyperCubeExtractor<'_> {
    fn extract(&mut self, df: &DataFrame) -> Result<Theory> {
        self.algorithm.validate()?;
        let mut data = Dataset::labelled(df, self.predictor)?;
        let searcher = self.algorithm.searcher();
        info!(
            algorithm = searcher.name(),
            rows = data.n_real(),
            features = data.n_features(),
            "extraction started"
        );

        let search = searcher.search(&mut data, self.predictor)?;
        let uncovered = data
            .real_indices()
            .filter(|&i| !search.cubes.iter().any(|c| c.contains(data.row(i))))
            .count();
        let bounds = HyperCube::surrounding(&data);
        let theory = Theory::from_cubes(
            &search.cubes,
            data.output_name(),
            Some(&bounds),
            self.discretization.as_ref(),
            self.normalization.as_ref(),
        );
        let report = ExtractionReport {
            algorithm: searcher.name().to_string(),
            target: searcher.target(),
            n_cubes: search.cubes.len(),
            converged: search.converged,
            iterations: search.iterations,
            uncovered,
            synthetic_rows: data.len() - data.n_real(),
        };
        info!(
            algorithm = searcher.name(),
            cubes = report.n_cubes,
            uncovered,
            converged = report.converged,
            "extraction finished"
        );

        self.cubes = search.cubes;
        self.features = Some(Arc::clone(data.features()));
        self.bounds = Some(bounds);
        self.theory = Some(theory.clone());
        self.report = Some(report);
        Ok(theory)
    }

    fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let features = self.feature_names()?;
        let rows = df.numeric_rows(features)?;
        Ok(rows.iter().map(|row| self.predict_row(row)).collect())
    }

    fn n_rules(&self) -> usize {
        self.cubes.len()
    }

    fn feature_names(&self) -> Result<&[String]> {
        self.features
            .as_deref()
            .ok_or(ExtractionError::NotExtracted)
    }
}
