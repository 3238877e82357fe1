use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model is not fitted")]
    NotFitted,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Numerical error: {0}")]
    Numerical(String),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// A trained model seen as a black box.
///
/// `predict` receives the input features only (no output column) and returns one value per
/// row. Class labels are returned as their numeric codes. Implementations must be pure: the
/// extractors call them many times, on real and on synthetic rows.
pub trait Predictor: Send + Sync {
    fn predict(&self, x: &DataFrame) -> Result<Vec<f64>, PredictError>;
}

impl<F> Predictor for F
where
    F: Fn(&DataFrame) -> Result<Vec<f64>, PredictError> + Send + Sync,
{
    fn predict(&self, x: &DataFrame) -> Result<Vec<f64>, PredictError> {
        self(x)
    }
}

/// Read one numeric column of `x` as `f64`, with nulls mapped to NaN.
pub fn column_f64(x: &DataFrame, name: &str) -> Result<Vec<f64>, PredictError> {
    let series = x.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}
