//! Recursive bisection driven by a two-component Gaussian mixture.
//!
//! Every split carves the bounding box of one mixture component out of its parent. The carved
//! box becomes the right child, the remainder keeps the parent's bounds as the left child, and
//! rules list right children before their left siblings.

use crate::conf::{Target, DEFAULT_SEED};
use crate::dataframe::Dataset;
use crate::error::{ExtractionError, Result};
use crate::extractor::{CubeSearch, Search};
use crate::hypercube::HyperCube;
use crate::interval::Interval;
use crate::mixture::GaussianMixture;
use crate::node::{Node, PartitionTree};
use estimators::api::Predictor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::debug;

/// How the carved cube is chosen among the mixture components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClusterSelection {
    /// Lowest average error of the two resulting children (CREAM).
    #[default]
    MinError,
    /// Largest carved cube, then most rows (CReEPy).
    MaxVolume,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub max_depth: usize,
    pub error_threshold: f64,
    pub selection: ClusterSelection,
    pub target: Target,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            error_threshold: 0.1,
            selection: ClusterSelection::MinError,
            target: Target::Constant,
            seed: DEFAULT_SEED,
        }
    }
}

impl ClusterConfig {
    pub fn cream() -> Self {
        Self::default()
    }

    pub fn creepy() -> Self {
        Self {
            selection: ClusterSelection::MaxVolume,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ExtractionError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if !self.error_threshold.is_finite() || self.error_threshold < 0.0 {
            return Err(ExtractionError::InvalidConfig(format!(
                "error_threshold must be a non-negative number, got {}",
                self.error_threshold
            )));
        }
        Ok(())
    }
}

// Candidate for priority queue (worst error first, shallower first on ties)
struct SplitCandidate {
    error: f64,
    depth: usize,
    node_index: usize,
}

impl PartialEq for SplitCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for SplitCandidate {}
impl PartialOrd for SplitCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SplitCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.error
            .total_cmp(&other.error)
            .then(other.depth.cmp(&self.depth))
            .then(other.node_index.cmp(&self.node_index))
    }
}

/// One admissible way of splitting a node.
struct Bisection {
    inner: HyperCube,
    inner_rows: Vec<usize>,
    outer: HyperCube,
    outer_rows: Vec<usize>,
}

impl Bisection {
    fn error(&self) -> f64 {
        (self.inner.diversity() + self.outer.diversity()) / 2.0
    }
}

pub struct ClusterExtractor {
    config: ClusterConfig,
}

impl ClusterExtractor {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Build the partition over the real rows of `data`, returning it with the number of
    /// splits made.
    ///
    /// Every real row is owned by exactly one leaf, and that leaf is the first one in
    /// [`PartitionTree::leaves`] order whose cube contains the row.
    pub fn grow_tree(&self, data: &Dataset) -> (PartitionTree, usize) {
        let real: Vec<usize> = data.real_indices().collect();
        let mut root_cube = HyperCube::surrounding(data);
        root_cube.update_with(data, &real, self.config.target);
        let mut tree = PartitionTree::new(Node::root(root_cube, real));

        let threshold = self.config.error_threshold;
        let mut heap: BinaryHeap<SplitCandidate> = BinaryHeap::new();
        let root_error = tree.root().error(data);
        if root_error > threshold {
            heap.push(SplitCandidate {
                error: root_error,
                depth: 0,
                node_index: 0,
            });
        }

        let mut splits = 0;
        while let Some(candidate) = heap.pop() {
            let Some(node) = tree.node(candidate.node_index) else {
                continue;
            };
            let Some(best) = self.select(self.candidates(node, data)) else {
                debug!(node = candidate.node_index, "no admissible bisection");
                continue;
            };
            let (left, right) = tree.attach(
                candidate.node_index,
                Node::root(best.outer, best.outer_rows),
                Node::root(best.inner, best.inner_rows),
            );
            splits += 1;
            debug!(
                node = candidate.node_index,
                depth = candidate.depth,
                error = candidate.error,
                "split node"
            );
            for index in [left, right] {
                if let Some(child) = tree.node(index) {
                    let error = child.error(data);
                    if child.depth < self.config.max_depth && error > threshold {
                        heap.push(SplitCandidate {
                            error,
                            depth: child.depth,
                            node_index: index,
                        });
                    }
                }
            }
        }
        (tree, splits)
    }

    /// Candidate bisections of `node`, one per non-degenerate mixture component.
    fn candidates(&self, node: &Node, data: &Dataset) -> Vec<Bisection> {
        if node.indices.len() < 2 {
            return Vec::new();
        }
        let rows: Vec<Vec<f64>> = node
            .indices
            .iter()
            .map(|&i| {
                let mut row = data.row(i).to_vec();
                row.push(data.prediction(i));
                row
            })
            .collect();
        let labels = GaussianMixture::new(2, self.config.seed.wrapping_add(node.path))
            .fit_predict(&rows);

        let target = self.config.target;
        let mut out = Vec::new();
        for component in 0..2 {
            let members: Vec<usize> = node
                .indices
                .iter()
                .zip(labels.iter())
                .filter(|&(_, &l)| l == component)
                .map(|(&i, _)| i)
                .collect();
            if members.is_empty() {
                continue;
            }
            let inner_box = bounding_cube(data, &members);
            let (inner_rows, outer_rows): (Vec<usize>, Vec<usize>) = node
                .indices
                .iter()
                .copied()
                .partition(|&i| inner_box.contains(data.row(i)));
            if inner_rows.is_empty() || outer_rows.is_empty() {
                continue;
            }
            let mut inner = inner_box;
            let mut outer = node.cube.clone();
            if !inner.update_with(data, &inner_rows, target)
                || !outer.update_with(data, &outer_rows, target)
            {
                continue;
            }
            out.push(Bisection {
                inner,
                inner_rows,
                outer,
                outer_rows,
            });
        }
        out
    }

    fn select(&self, candidates: Vec<Bisection>) -> Option<Bisection> {
        let mut best: Option<Bisection> = None;
        for candidate in candidates {
            let better = match &best {
                None => true,
                Some(current) => self.compare(&candidate, current) == Ordering::Less,
            };
            if better {
                best = Some(candidate);
            }
        }
        best
    }

    /// `Less` when `a` is preferred; equal keys keep the earlier candidate.
    fn compare(&self, a: &Bisection, b: &Bisection) -> Ordering {
        match self.config.selection {
            ClusterSelection::MinError => a
                .error()
                .total_cmp(&b.error())
                .then(b.inner.padded_volume().total_cmp(&a.inner.padded_volume()))
                .then(b.outer.padded_volume().total_cmp(&a.outer.padded_volume())),
            ClusterSelection::MaxVolume => b
                .inner
                .padded_volume()
                .total_cmp(&a.inner.padded_volume())
                .then(b.inner_rows.len().cmp(&a.inner_rows.len())),
        }
    }
}

impl CubeSearch for ClusterExtractor {
    fn name(&self) -> &'static str {
        match self.config.selection {
            ClusterSelection::MinError => "CREAM",
            ClusterSelection::MaxVolume => "CReEPy",
        }
    }

    fn target(&self) -> Target {
        self.config.target
    }

    fn search(&self, data: &mut Dataset, _predictor: &dyn Predictor) -> Result<Search> {
        let (tree, splits) = self.grow_tree(data);
        Ok(Search {
            cubes: tree.into_cubes(),
            converged: true,
            iterations: splits,
        })
    }
}

/// Closed bounding box of the given rows.
fn bounding_cube(data: &Dataset, rows: &[usize]) -> HyperCube {
    let intervals = (0..data.n_features())
        .map(|j| {
            let (lo, hi) = rows.iter().map(|&i| data.row(i)[j]).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(v), hi.max(v)),
            );
            Interval::closed(lo, hi)
        })
        .collect();
    HyperCube::from_intervals(Arc::clone(data.features()), intervals)
}
