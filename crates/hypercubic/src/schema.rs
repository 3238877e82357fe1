//! Optional descriptions of how the training frame was prepared, used to turn cube bounds
//! back into human-facing constraints.

use crate::dataframe::HyperCubeDataFrameExt;
use crate::error::Result;
use crate::interval::Interval;
use crate::regression::LinearModel;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A symbolic feature that was one-hot encoded into indicator columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscreteFeature {
    pub name: String,
    /// indicator column -> symbolic value it stands for
    pub admissible_values: BTreeMap<String, String>,
}

impl DiscreteFeature {
    pub fn new<I, S, V>(name: S, admissible_values: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            admissible_values: admissible_values
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Discretization {
    pub features: Vec<DiscreteFeature>,
}

impl Discretization {
    pub fn new(features: Vec<DiscreteFeature>) -> Self {
        Self { features }
    }

    /// The discrete feature an indicator column belongs to, with the value it encodes.
    pub fn lookup(&self, column: &str) -> Option<(&str, &str)> {
        self.features.iter().find_map(|f| {
            f.admissible_values
                .get(column)
                .map(|value| (f.name.as_str(), value.as_str()))
        })
    }
}

/// Per-feature `(offset, scale)` such that `normalised = (raw - offset) / scale`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub parameters: BTreeMap<String, (f64, f64)>,
}

impl Normalization {
    pub fn new(parameters: BTreeMap<String, (f64, f64)>) -> Self {
        Self { parameters }
    }

    /// Z-score parameters for every column of `df`.
    pub fn fit(df: &DataFrame) -> Result<Self> {
        let mut parameters = BTreeMap::new();
        for name in df.column_names_vec() {
            let values: Vec<f64> = df
                .numeric_column(&name)?
                .into_iter()
                .filter(|v| !v.is_nan())
                .collect();
            if values.is_empty() {
                parameters.insert(name, (0.0, 1.0));
                continue;
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = if var > 0.0 { var.sqrt() } else { 1.0 };
            parameters.insert(name, (mean, std));
        }
        Ok(Self { parameters })
    }

    /// Normalised copy of `df`; columns without parameters are kept as they are.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(df.width());
        for name in df.column_names_vec() {
            match self.parameters.get(&name) {
                Some(&(offset, scale)) => {
                    let values: Vec<f64> = df
                        .numeric_column(&name)?
                        .into_iter()
                        .map(|v| (v - offset) / scale)
                        .collect();
                    columns.push(Series::new(PlSmallStr::from_str(&name), values).into());
                }
                None => columns.push(df.column(&name)?.clone()),
            }
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn denormalize_value(&self, name: &str, value: f64) -> f64 {
        match self.parameters.get(name) {
            Some(&(offset, scale)) => value * scale + offset,
            None => value,
        }
    }

    pub fn denormalize(&self, name: &str, interval: &Interval) -> Interval {
        let mut out = *interval;
        out.low = self.denormalize_value(name, interval.low);
        out.high = self.denormalize_value(name, interval.high);
        if out.low > out.high {
            std::mem::swap(&mut out.low, &mut out.high);
            std::mem::swap(&mut out.lower_closed, &mut out.upper_closed);
        }
        out
    }

    /// Rewrite a model fitted on normalised columns so it reads raw `features` and yields the
    /// raw `output`.
    ///
    /// With `z = (x - o) / s` per feature and `y = y' * s_y + o_y`, each coefficient becomes
    /// `s_y * c / s` and the intercept absorbs the feature offsets.
    pub fn denormalize_model(
        &self,
        output: &str,
        features: &[String],
        model: &LinearModel,
    ) -> LinearModel {
        let (output_offset, output_scale) = self.scale_of(output);
        let mut intercept = model.intercept;
        let coefficients = features
            .iter()
            .zip(model.coefficients.iter())
            .map(|(name, &c)| {
                let (offset, scale) = self.scale_of(name);
                intercept -= c * offset / scale;
                output_scale * c / scale
            })
            .collect();
        LinearModel {
            intercept: output_scale * intercept + output_offset,
            coefficients,
        }
    }

    fn scale_of(&self, name: &str) -> (f64, f64) {
        self.parameters.get(name).copied().unwrap_or((0.0, 1.0))
    }
}
