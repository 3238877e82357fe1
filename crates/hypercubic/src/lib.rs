//! # Hypercubic
//!
//! Symbolic rule extraction from black-box predictors over tabular data.
//!
//! Every extractor partitions feature space into axis-aligned hypercubes and fits the output
//! of each cube to the predictor's answers (never to the raw labels), so the resulting rules
//! describe the model rather than the data.
//!
//! ## Algorithms
//!
//! - **GridEx / GridREx**: regular grid refinement with adjacent-cell merging
//! - **ITER**: cubes grown slab by slab from seed points
//! - **CREAM / CReEPy**: recursive bisection by a two-component Gaussian mixture
//! - **DiViNE**: nearest-neighbour region growth for classifiers
//!
//! ## Example
//!
//! ```rust,ignore
//! use hypercubic::prelude::*;
//!
//! let predictor = |x: &DataFrame| -> Result<Vec<f64>, PredictError> {
//!     let a = column_f64(x, "a")?;
//!     Ok(a.iter().map(|v| if *v < 0.5 { 0.0 } else { 1.0 }).collect())
//! };
//! let mut extractor = HyperCubeExtractor::gridex(&predictor, GridExConfig::default());
//! let theory = extractor.extract(&df)?;
//! println!("{theory}");
//! ```

// Module declarations
pub mod cluster;
pub mod conf;
pub mod dataframe;
pub mod divine;
pub mod error;
pub mod extractor;
pub mod grid;
pub mod gridex;
pub mod hypercube;
pub mod interval;
pub mod iter;
pub mod mixture;
pub mod neighbors;
pub mod node;
pub mod point;
pub mod ranker;
pub mod regression;
pub mod schema;
pub mod theory;

pub mod prelude {
    pub use crate::cluster::{ClusterConfig, ClusterSelection};
    pub use crate::conf::Target;
    pub use crate::divine::DivineConfig;
    pub use crate::error::{ExtractionError, Result};
    pub use crate::extractor::{Algorithm, ExtractionReport, Extractor, HyperCubeExtractor};
    pub use crate::grid::{Grid, Strategy};
    pub use crate::gridex::GridExConfig;
    pub use crate::hypercube::{CubeOutput, HyperCube};
    pub use crate::interval::Interval;
    pub use crate::iter::IterConfig;
    pub use crate::ranker::FeatureRanker;
    pub use crate::theory::{Constraint, Rule, Theory};
    pub use estimators::api::{column_f64, PredictError, Predictor};
    pub use polars::prelude::{DataFrame, NamedFrom, Series};
}
