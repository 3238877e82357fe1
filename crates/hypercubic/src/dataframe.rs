//! Conversions between polars frames and the dense row storage the extractors work on.
//!
//! Frames follow one convention: every column but the last is an input feature, the last
//! column is the output. Features are read as `f64`.

use crate::error::{ExtractionError, Result};
use estimators::api::Predictor;
use polars::prelude::*;
use std::sync::Arc;

/// Extension methods for DataFrame
pub trait HyperCubeDataFrameExt {
    /// All column names as owned Strings
    fn column_names_vec(&self) -> Vec<String>;

    /// Every column but the last one
    fn feature_names(&self) -> Vec<String>;

    /// Name of the last column
    fn output_name(&self) -> Option<String>;

    /// Numeric column by name, nulls mapped to NaN
    fn numeric_column(&self, name: &str) -> Result<Vec<f64>>;

    /// Row-major copy of the given columns
    fn numeric_rows(&self, names: &[String]) -> Result<Vec<Vec<f64>>>;
}

impl HyperCubeDataFrameExt for DataFrame {
    fn column_names_vec(&self) -> Vec<String> {
        self.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names = self.column_names_vec();
        names.pop();
        names
    }

    fn output_name(&self) -> Option<String> {
        self.column_names_vec().pop()
    }

    fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self
            .column(name)
            .map_err(|_| ExtractionError::InvalidInput(format!("Column '{name}' not found")))?;
        let series = column.as_materialized_series().cast(&DataType::Float64)?;
        Ok(series
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    fn numeric_rows(&self, names: &[String]) -> Result<Vec<Vec<f64>>> {
        let columns = names
            .iter()
            .map(|name| self.numeric_column(name))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.height())
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect())
    }
}

/// Build a frame with one `f64` column per feature from row-major values.
pub fn rows_to_frame(features: &[String], rows: &[&[f64]]) -> Result<DataFrame> {
    let columns: Vec<Column> = features
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = rows.iter().map(|row| row[j]).collect();
            Series::new(PlSmallStr::from_str(name), values).into()
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Training rows plus the predictor's output on each of them.
///
/// The first `n_real` rows come from the caller's frame; rows appended afterwards are
/// synthetic samples drawn by the extractors and labelled by the predictor.
#[derive(Clone, Debug)]
pub struct Dataset {
    features: Arc<[String]>,
    output_name: String,
    rows: Vec<Vec<f64>>,
    predictions: Vec<f64>,
    n_real: usize,
}

impl Dataset {
    /// Split `df` into features and output, then label every row with `predictor`.
    pub fn labelled(df: &DataFrame, predictor: &dyn Predictor) -> Result<Self> {
        if df.height() == 0 {
            return Err(ExtractionError::EmptyDataFrame);
        }
        if df.width() < 2 {
            return Err(ExtractionError::InvalidInput(
                "expected at least one feature column followed by the output column".to_string(),
            ));
        }
        let features = df.feature_names();
        let output_name = df.output_name().unwrap_or_default();
        let rows = df.numeric_rows(&features)?;

        let mut dataset = Dataset {
            features: features.into(),
            output_name,
            rows,
            predictions: Vec::new(),
            n_real: df.height(),
        };
        let all: Vec<usize> = (0..dataset.len()).collect();
        dataset.predictions = dataset.predict_rows(predictor, &all)?;
        Ok(dataset)
    }

    pub fn features(&self) -> &Arc<[String]> {
        &self.features
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_real(&self) -> usize {
        self.n_real
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn prediction(&self, i: usize) -> f64 {
        self.predictions[i]
    }

    pub fn predictions_at(&self, idx: &[usize]) -> Vec<f64> {
        idx.iter().map(|&i| self.predictions[i]).collect()
    }

    pub fn real_indices(&self) -> std::ops::Range<usize> {
        0..self.n_real
    }

    /// Frame holding the feature columns of the selected rows.
    pub fn features_frame(&self, idx: &[usize]) -> Result<DataFrame> {
        let rows: Vec<&[f64]> = idx.iter().map(|&i| self.rows[i].as_slice()).collect();
        rows_to_frame(&self.features, &rows)
    }

    fn predict_rows(&self, predictor: &dyn Predictor, idx: &[usize]) -> Result<Vec<f64>> {
        let frame = self.features_frame(idx)?;
        let predicted = predictor.predict(&frame)?;
        if predicted.len() != idx.len() {
            return Err(ExtractionError::InvalidInput(format!(
                "predictor returned {} values for {} rows",
                predicted.len(),
                idx.len()
            )));
        }
        Ok(predicted)
    }

    /// Append synthetic rows, labelled by `predictor`. Returns the indices of the new rows.
    pub fn push_synthetic(
        &mut self,
        rows: Vec<Vec<f64>>,
        predictor: &dyn Predictor,
    ) -> Result<std::ops::Range<usize>> {
        let start = self.rows.len();
        if rows.is_empty() {
            return Ok(start..start);
        }
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let frame = rows_to_frame(&self.features, &refs)?;
        let predicted = predictor.predict(&frame)?;
        if predicted.len() != rows.len() {
            return Err(ExtractionError::InvalidInput(format!(
                "predictor returned {} values for {} rows",
                predicted.len(),
                rows.len()
            )));
        }
        self.rows.extend(rows);
        self.predictions.extend(predicted);
        Ok(start..self.rows.len())
    }

    /// Per-feature (min, max) over the real rows.
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        (0..self.n_features())
            .map(|j| {
                self.rows[..self.n_real]
                    .iter()
                    .map(|r| r[j])
                    .filter(|v| !v.is_nan())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    })
            })
            .collect()
    }
}
