use std::sync::Arc;

/// Immutable coordinates over named features, plus the output coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    names: Arc<[String]>,
    values: Vec<f64>,
    output: f64,
}

impl Point {
    pub fn new(names: Arc<[String]>, values: Vec<f64>, output: f64) -> Self {
        assert_eq!(
            names.len(),
            values.len(),
            "point has {} names but {} values",
            names.len(),
            values.len()
        );
        Self {
            names,
            values,
            output,
        }
    }

    pub fn names(&self) -> &Arc<[String]> {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.values.iter().copied())
    }

    pub fn distance(&self, other: &[f64]) -> f64 {
        euclidean(&self.values, other)
    }
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
