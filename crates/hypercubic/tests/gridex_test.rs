mod common;

use estimators::api::{column_f64, PredictError};
use hypercubic::prelude::*;
use polars::prelude::*;

fn quadrant_config(threshold: f64) -> GridExConfig {
    GridExConfig::new(Grid::new(1, Strategy::fixed(2)), threshold)
}

#[test]
fn four_quadrants_give_four_rules() {
    let df = common::quadrants_df(10);
    let mut extractor = HyperCubeExtractor::gridex(&common::quadrant_predictor, quadrant_config(0.01));
    let theory = extractor.extract(&df).unwrap();

    assert_eq!(theory.len(), 4);
    assert_eq!(extractor.n_rules(), 4);
    let bounds = [0.05, 0.5, 0.95];
    for cube in extractor.cubes() {
        // every cube is one quadrant: its bounds sit on the grid lines
        for interval in cube.intervals() {
            assert!(bounds.iter().any(|b| (b - interval.low).abs() < 1e-9));
            assert!(bounds.iter().any(|b| (b - interval.high).abs() < 1e-9));
            assert!((interval.width() - 0.45).abs() < 1e-9);
        }
        let center = cube.center();
        let expected = common::quadrant(center[0], center[1]);
        assert_eq!(cube.output(), Some(&CubeOutput::Constant(expected)));
        assert!(cube.diversity() < 1e-12);
    }
    let mut outputs: Vec<f64> = extractor
        .cubes()
        .iter()
        .filter_map(|c| c.output().and_then(|o| o.as_scalar()))
        .collect();
    outputs.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(outputs, vec![0.0, 1.0, 2.0, 3.0]);

    // every training row is in exactly one cube
    for row in common::xy_rows(&df) {
        let hits = extractor.cubes().iter().filter(|c| c.contains(&row)).count();
        assert_eq!(hits, 1);
    }
    assert_eq!(extractor.mae(&df, None).unwrap(), 0.0);
    assert_eq!(extractor.r2(&df, None).unwrap(), 1.0);

    let report = extractor.report().unwrap();
    assert_eq!(report.algorithm, "GridEx");
    assert_eq!(report.uncovered, 0);
    // 100 real rows per cell, padded to 250
    assert_eq!(report.synthetic_rows, 4 * 150);
}

#[test]
fn larger_threshold_never_adds_rules() {
    let df = common::quadrants_df(6);
    let mut previous = usize::MAX;
    let mut counts = Vec::new();
    for threshold in [0.0, 0.01, 0.6, 1.1] {
        let mut extractor = HyperCubeExtractor::gridex(
            &common::quadrant_predictor,
            quadrant_config(threshold).with_min_examples(50),
        );
        let n = extractor.extract(&df).unwrap().len();
        assert!(n <= previous, "threshold {threshold} gave {n} rules after {previous}");
        previous = n;
        counts.push(n);
    }
    assert_eq!(counts, vec![4, 4, 2, 1]);
}

#[test]
fn same_seed_same_theory() {
    let df = common::quadrants_df(5);
    let config = GridExConfig::new(Grid::new(2, Strategy::fixed(3)), 0.05).with_seed(9);
    let first = HyperCubeExtractor::gridex(&common::quadrant_predictor, config.clone())
        .extract(&df)
        .unwrap();
    let second = HyperCubeExtractor::gridex(&common::quadrant_predictor, config)
        .extract(&df)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn iterations_refine_only_impure_cells() {
    // with three bins per side the middle cells straddle the quadrant borders
    let df = common::quadrants_df(6);
    let config = GridExConfig::new(Grid::new(2, Strategy::fixed(3)), 0.01).with_min_examples(20);
    let mut one = HyperCubeExtractor::gridex(
        &common::quadrant_predictor,
        GridExConfig {
            grid: Grid::new(1, Strategy::fixed(3)),
            ..config.clone()
        },
    );
    let mut two = HyperCubeExtractor::gridex(&common::quadrant_predictor, config);
    one.extract(&df).unwrap();
    two.extract(&df).unwrap();
    assert!(two.mae(&df, None).unwrap() < one.mae(&df, None).unwrap());
}

fn linear(df: &DataFrame) -> Result<Vec<f64>, PredictError> {
    let a = column_f64(df, "a")?;
    let b = column_f64(df, "b")?;
    Ok(a.iter().zip(b.iter()).map(|(a, b)| 2.0 * a - b + 1.0).collect())
}

#[test]
fn gridrex_recovers_a_linear_predictor_with_one_rule() {
    let n = 80;
    let a: Vec<f64> = (0..n).map(|i| (i % 10) as f64 / 9.0).collect();
    let b: Vec<f64> = (0..n).map(|i| (i / 10) as f64 / 7.0).collect();
    let y: Vec<f64> = a.iter().zip(b.iter()).map(|(a, b)| 2.0 * a - b + 1.0).collect();
    let df = df!("a" => a, "b" => b, "y" => y).unwrap();

    let config = quadrant_config(0.01).with_min_examples(20);
    let mut extractor = HyperCubeExtractor::gridrex(&linear, config);
    let theory = extractor.extract(&df).unwrap();
    assert_eq!(theory.len(), 1);
    assert!(matches!(theory.rules[0].output, CubeOutput::Linear(_)));
    assert!(extractor.mae(&df, Some(&linear)).unwrap() < 1e-4);
    assert_eq!(extractor.report().unwrap().algorithm, "GridREx");
}

#[test]
fn rows_outside_every_cube_are_undefined_and_not_scored() {
    let df = common::quadrants_df(4);
    let mut extractor = HyperCubeExtractor::gridex(
        &common::quadrant_predictor,
        quadrant_config(0.01).with_min_examples(10),
    );
    extractor.extract(&df).unwrap();

    let test = df!(
        "x" => &[0.2, 0.8, 2.0, -1.0],
        "y" => &[0.2, 0.8, 0.5, 0.5],
        "label" => &[0.0, 3.0, 100.0, 100.0]
    )
    .unwrap();
    let predicted = extractor.predict(&test).unwrap();
    assert_eq!(&predicted[..2], &[0.0, 3.0]);
    assert!(predicted[2].is_nan());
    assert!(predicted[3].is_nan());
    assert_eq!(extractor.mae(&test, None).unwrap(), 0.0);
    assert_eq!(extractor.mse(&test, Some(&common::quadrant_predictor)).unwrap(), 0.0);
}
