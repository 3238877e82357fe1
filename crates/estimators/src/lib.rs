//! Boundary types shared between black-box models and the rule extractors built on top of them.

pub mod api;

pub use api::{PredictError, Predictor};
