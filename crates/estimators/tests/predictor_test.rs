use estimators::api::{column_f64, PredictError, Predictor};
use polars::prelude::*;

fn threshold_model(x: &DataFrame) -> Result<Vec<f64>, PredictError> {
    let a = column_f64(x, "a")?;
    Ok(a.into_iter().map(|v| if v > 0.5 { 1.0 } else { 0.0 }).collect())
}

#[test]
fn closures_and_functions_are_predictors() {
    let df = df!("a" => &[0.1_f64, 0.7, 0.5], "b" => &[1_i32, 2, 3]).unwrap();

    let offset = 2.0;
    let closure = move |x: &DataFrame| -> Result<Vec<f64>, PredictError> {
        Ok(column_f64(x, "b")?.into_iter().map(|v| v + offset).collect())
    };

    assert_eq!(threshold_model.predict(&df).unwrap(), vec![0.0, 1.0, 0.0]);
    assert_eq!(closure.predict(&df).unwrap(), vec![3.0, 4.0, 5.0]);

    let boxed: Box<dyn Predictor> = Box::new(closure);
    assert_eq!(boxed.predict(&df).unwrap().len(), 3);
}

#[test]
fn missing_column_is_reported_as_polars_error() {
    let df = df!("b" => &[1.0_f64]).unwrap();
    let err = threshold_model.predict(&df).unwrap_err();
    assert!(matches!(err, PredictError::Polars(_)));
}

#[test]
fn nulls_are_read_as_nan() {
    let df = df!("a" => &[Some(1.0_f64), None]).unwrap();
    let values = column_f64(&df, "a").unwrap();
    assert_eq!(values[0], 1.0);
    assert!(values[1].is_nan());
}
