mod common;

use std::sync::Arc;

use hypercubic::cluster::ClusterExtractor;
use hypercubic::dataframe::Dataset;
use hypercubic::hypercube::HyperCube;
use hypercubic::interval::Interval;
use hypercubic::node::{Node, PartitionTree};
use hypercubic::prelude::*;

fn unit_cube() -> HyperCube {
    let names: Arc<[String]> = vec!["x".to_string()].into();
    HyperCube::from_intervals(names, vec![Interval::closed(0.0, 1.0)])
}

#[test]
fn partition_tree_lists_right_children_first() {
    let mut tree = PartitionTree::new(Node::root(unit_cube(), vec![0, 1, 2, 3]));
    let (left, right) = tree.attach(
        0,
        Node::root(unit_cube(), vec![0, 1]),
        Node::root(unit_cube(), vec![2, 3]),
    );
    let (left_left, left_right) = tree.attach(
        left,
        Node::root(unit_cube(), vec![0]),
        Node::root(unit_cube(), vec![1]),
    );

    assert_eq!(tree.num_nodes(), 5);
    assert_eq!(tree.leaves(), vec![right, left_right, left_left]);
    assert_eq!(tree.max_depth(), 2);

    let child = tree.node(left_right).unwrap();
    assert_eq!(child.depth, 2);
    assert_eq!(child.parent, Some(left));
    assert!(child.is_leaf());
    assert!(!tree.root().is_leaf());
    assert!(tree.root().is_root());
    // complete binary numbering: root 1, left 2, left-right 5
    assert_eq!(child.path, 5);
}

#[test]
fn cream_covers_every_row_and_respects_depth() {
    let df = common::quadrants_df(6);
    for max_depth in [1, 2, 3] {
        let config = ClusterConfig {
            max_depth,
            ..ClusterConfig::cream()
        };
        let mut extractor = HyperCubeExtractor::cream(&common::quadrant_predictor, config);
        extractor.extract(&df).unwrap();

        assert!(extractor.n_rules() >= 1);
        assert!(extractor.n_rules() <= 1 << max_depth);
        // the last leaf keeps the root bounds, so nothing in the training range is unexplained
        let predicted = extractor.predict(&df).unwrap();
        assert!(predicted.iter().all(|p| !p.is_nan()));
        assert_eq!(extractor.report().unwrap().uncovered, 0);
    }
}

#[test]
fn cream_improves_on_a_single_rule() {
    let df = common::quadrants_df(6);
    let mut single = HyperCubeExtractor::cream(
        &common::quadrant_predictor,
        ClusterConfig {
            error_threshold: 10.0,
            ..ClusterConfig::cream()
        },
    );
    let mut deep = HyperCubeExtractor::cream(&common::quadrant_predictor, ClusterConfig::cream());
    single.extract(&df).unwrap();
    deep.extract(&df).unwrap();

    assert_eq!(single.n_rules(), 1);
    assert!(deep.n_rules() > 1);
    assert!(deep.mae(&df, None).unwrap() < single.mae(&df, None).unwrap());
}

#[test]
fn larger_error_threshold_never_adds_rules() {
    let df = common::quadrants_df(6);
    let mut previous = usize::MAX;
    for threshold in [0.0, 0.05, 0.3, 0.8, 2.0] {
        let config = ClusterConfig {
            error_threshold: threshold,
            ..ClusterConfig::cream()
        };
        let mut extractor = HyperCubeExtractor::cream(&common::quadrant_predictor, config);
        let n = extractor.extract(&df).unwrap().len();
        assert!(n <= previous, "threshold {threshold} gave {n} rules after {previous}");
        previous = n;
    }
    assert_eq!(previous, 1);
}

#[test]
fn cream_is_deterministic() {
    let df = common::quadrants_df(5);
    let first = HyperCubeExtractor::cream(&common::quadrant_predictor, ClusterConfig::cream())
        .extract(&df)
        .unwrap();
    let second = HyperCubeExtractor::cream(&common::quadrant_predictor, ClusterConfig::cream())
        .extract(&df)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn creepy_runs_the_same_recursion() {
    let df = common::quadrants_df(6);
    let mut extractor = HyperCubeExtractor::creepy(&common::quadrant_predictor, ClusterConfig::creepy());
    extractor.extract(&df).unwrap();
    assert_eq!(extractor.report().unwrap().algorithm, "CReEPy");
    assert!(extractor.n_rules() <= 8);
    assert!(extractor.predict(&df).unwrap().iter().all(|p| !p.is_nan()));
}

#[test]
fn zero_depth_is_a_configuration_error() {
    let df = common::quadrants_df(4);
    let config = ClusterConfig {
        max_depth: 0,
        ..ClusterConfig::cream()
    };
    let mut extractor = HyperCubeExtractor::cream(&common::quadrant_predictor, config);
    assert!(matches!(
        extractor.extract(&df),
        Err(ExtractionError::InvalidConfig(_))
    ));
    assert!(matches!(
        extractor.predict(&df),
        Err(ExtractionError::NotExtracted)
    ));
}

#[test]
fn first_matching_rule_is_the_leaf_owning_the_row() {
    let df = common::quadrants_df(6);
    let data = Dataset::labelled(&df, &common::quadrant_predictor).unwrap();
    for config in [ClusterConfig::cream(), ClusterConfig::creepy()] {
        let (tree, splits) = ClusterExtractor::new(config.clone()).grow_tree(&data);
        assert!(splits > 0);
        let leaves = tree.leaves();

        for i in data.real_indices() {
            let owners: Vec<usize> = leaves
                .iter()
                .copied()
                .filter(|&l| tree.node(l).unwrap().indices.contains(&i))
                .collect();
            assert_eq!(owners.len(), 1, "row {i} owned by {owners:?}");
            // left children keep the parent's bounds, so later leaves may contain the row too
            let first = leaves
                .iter()
                .copied()
                .find(|&l| tree.node(l).unwrap().cube.contains(data.row(i)));
            assert_eq!(first, Some(owners[0]), "row {i} matched the wrong leaf");
        }

        // the extractor emits exactly these leaves, in this order
        let cubes = tree.into_cubes();
        let mut extractor = HyperCubeExtractor::new(
            &common::quadrant_predictor,
            match config.selection {
                ClusterSelection::MinError => Algorithm::Cream(config),
                ClusterSelection::MaxVolume => Algorithm::Creepy(config),
            },
        );
        extractor.extract(&df).unwrap();
        assert_eq!(extractor.cubes(), cubes.as_slice());
    }
}
