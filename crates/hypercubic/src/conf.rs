use serde::{Deserialize, Serialize};

pub const DEFAULT_SEED: u64 = 42;
/// Width floor used when volumes are compared, so flat cubes do not all tie at zero.
pub const MIN_WIDTH: f64 = 1e-9;
/// Ridge added to the normal equations of local linear models.
pub const RIDGE: f64 = 1e-8;
pub const EPSILON: f64 = 1e-12;

/// What a cube outputs, and how its fit quality (diversity) is measured.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum Target {
    /// Mean of the predictions; diversity is the mean absolute deviation.
    #[default]
    Constant,
    /// Least squares linear model over the features; diversity is its mean absolute error.
    Regression,
    /// Majority class; diversity is the fraction of disagreeing predictions.
    Classification,
}

impl Target {
    pub fn is_classification(&self) -> bool {
        matches!(self, Target::Classification)
    }
}
