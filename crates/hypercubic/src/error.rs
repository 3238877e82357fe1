use estimators::api::PredictError;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Cannot extract rules from an empty DataFrame")]
    EmptyDataFrame,
    #[error("Extractor has not been run yet")]
    NotExtracted,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("Predictor failed: {0}")]
    Predict(#[from] PredictError),
}

pub type Result<T, E = ExtractionError> = std::result::Result<T, E>;
