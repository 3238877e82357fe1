#![allow(dead_code)]

use estimators::api::{column_f64, PredictError};
use polars::prelude::*;

/// Quadrant index of a point of the unit square: 0 bottom-left, 1 bottom-right,
/// 2 top-left, 3 top-right.
pub fn quadrant(x: f64, y: f64) -> f64 {
    let right = if x >= 0.5 { 1.0 } else { 0.0 };
    let top = if y >= 0.5 { 2.0 } else { 0.0 };
    right + top
}

pub fn quadrant_predictor(df: &DataFrame) -> Result<Vec<f64>, PredictError> {
    let xs = column_f64(df, "x")?;
    let ys = column_f64(df, "y")?;
    Ok(xs.iter().zip(ys.iter()).map(|(x, y)| quadrant(*x, *y)).collect())
}

/// `per_side * per_side` grid points inside each quadrant of the unit square, kept
/// 0.05 away from the square's edges and from the quadrant borders.
pub fn quadrants_df(per_side: usize) -> DataFrame {
    let steps: Vec<f64> = (0..per_side)
        .map(|i| 0.05 + 0.4 * i as f64 / (per_side.max(2) - 1) as f64)
        .collect();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut labels = Vec::new();
    for (ox, oy) in [(0.0, 0.0), (0.5, 0.0), (0.0, 0.5), (0.5, 0.5)] {
        for &sx in &steps {
            for &sy in &steps {
                xs.push(ox + sx);
                ys.push(oy + sy);
                labels.push(quadrant(ox + sx, oy + sy));
            }
        }
    }
    df!("x" => xs, "y" => ys, "label" => labels).unwrap()
}

/// Rows as `(x, y)` pairs, for containment checks.
pub fn xy_rows(df: &DataFrame) -> Vec<[f64; 2]> {
    let xs = column_f64(df, "x").unwrap();
    let ys = column_f64(df, "y").unwrap();
    xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect()
}

pub fn cloud_predictor(df: &DataFrame) -> Result<Vec<f64>, PredictError> {
    let xs = column_f64(df, "x")?;
    Ok(xs.iter().map(|x| if *x < 5.0 { 0.0 } else { 1.0 }).collect())
}

/// Two 6x6 grids with spacing 0.1: one at the origin labelled 0, one at (10, 10)
/// labelled 1.
pub fn two_clouds_df() -> DataFrame {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut labels = Vec::new();
    for (offset, label) in [(0.0, 0.0), (10.0, 1.0)] {
        for i in 0..6 {
            for j in 0..6 {
                xs.push(offset + i as f64 * 0.1);
                ys.push(offset + j as f64 * 0.1);
                labels.push(label);
            }
        }
    }
    df!("x" => xs, "y" => ys, "label" => labels).unwrap()
}
