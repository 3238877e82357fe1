use std::sync::Arc;

use estimators::api::{column_f64, PredictError};
use hypercubic::grid::{Grid, Strategy};
use hypercubic::hypercube::HyperCube;
use hypercubic::interval::Interval;
use hypercubic::ranker::FeatureRanker;
use polars::prelude::*;

fn columns() -> Vec<String> {
    vec!["a".to_string(), "b".to_string(), "c".to_string()]
}

#[test]
fn fixed_strategy_counts_cells() {
    let s = Strategy::fixed(3);
    assert_eq!(s.bins("a"), 3);
    assert_eq!(s.partition_number(&columns()), 27);
    // zero bins is clamped by the constructor
    assert_eq!(Strategy::fixed(0).bins("a"), 1);
}

#[test]
fn adaptive_strategy_uses_importance_bands() {
    let ranking = vec![
        ("a".to_string(), 1.0),
        ("b".to_string(), 0.5),
        ("c".to_string(), 0.1),
    ];
    let s = Strategy::adaptive_default(ranking);
    assert_eq!(s.bins("a"), 3);
    assert_eq!(s.bins("b"), 2);
    assert_eq!(s.bins("c"), 1);
    assert_eq!(s.bins("unknown"), 1);
    assert_eq!(s.partition_number(&columns()), 6);
}

#[test]
fn strategies_compare_by_bin_assignment() {
    let ranking = vec![("a".to_string(), 1.0), ("b".to_string(), 0.9)];
    let adaptive = Strategy::adaptive(ranking, vec![(0.5, 2)]);
    let two = ["a".to_string(), "b".to_string()];
    assert!(adaptive.equals(&Strategy::fixed(2), &two));
    assert!(!adaptive.equals(&Strategy::fixed(3), &two));
    assert!(!adaptive.equals(&Strategy::fixed(2), &columns()));
}

#[test]
fn grid_split_covers_each_point_once() {
    let features: Arc<[String]> = vec!["x".to_string(), "y".to_string()].into();
    let cube = HyperCube::from_intervals(
        features,
        vec![Interval::closed(0.0, 1.0), Interval::closed(0.0, 2.0)],
    );
    let grid = Grid::new(1, Strategy::fixed(2));
    let cells = grid.split(&cube);
    assert_eq!(cells.len(), grid.partition_number(cube.features()));
    assert_eq!(cells.len(), 4);
    for x in [0.0, 0.25, 0.5, 0.75, 1.0] {
        for y in [0.0, 0.5, 1.0, 1.5, 2.0] {
            let hits = cells.iter().filter(|c| c.contains(&[x, y])).count();
            assert_eq!(hits, 1, "({x}, {y}) is in {hits} cells");
        }
    }
    let total: f64 = cells.iter().map(|c| c.volume()).sum();
    assert!((total - cube.volume()).abs() < 1e-12);
}

#[test]
fn display_lists_bins() {
    assert_eq!(Strategy::fixed(2).to_string(), "Fixed (2)");
    let grid = Grid::new(2, Strategy::fixed(4));
    assert_eq!(grid.to_string(), "Grid (2 iterations, Fixed (4))");
}

fn only_a(df: &DataFrame) -> Result<Vec<f64>, PredictError> {
    let a = column_f64(df, "a")?;
    Ok(a.iter().map(|v| 3.0 * v).collect())
}

#[test]
fn ranker_finds_the_only_relevant_feature() {
    let n = 60;
    let a: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
    let b: Vec<f64> = (0..n).map(|i| ((i * 7) % n) as f64 / n as f64).collect();
    let x = df!("a" => a, "b" => b).unwrap();

    let rankings = FeatureRanker::new(vec!["a".to_string(), "b".to_string()], 7)
        .with_repeats(3)
        .fit(&only_a, &x)
        .unwrap()
        .rankings();
    assert_eq!(rankings[0].0, "a");
    assert_eq!(rankings[0].1, 1.0);
    assert_eq!(rankings[1], ("b".to_string(), 0.0));

    let strategy = Strategy::adaptive_default(rankings);
    assert_eq!(strategy.bins("a"), 3);
    assert_eq!(strategy.bins("b"), 1);
}

#[test]
fn ranker_rejects_empty_frames() {
    let x = df!("a" => Vec::<f64>::new(), "b" => Vec::<f64>::new()).unwrap();
    let result = FeatureRanker::new(vec!["a".to_string(), "b".to_string()], 0).fit(&only_a, &x);
    assert!(result.is_err());
}
