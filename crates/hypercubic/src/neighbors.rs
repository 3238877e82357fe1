//! A small KD-tree over feature rows for nearest-neighbour queries.

use crate::point::squared_euclidean;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A node in the KDTree
#[derive(Debug)]
struct Node {
    id: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug, PartialEq)]
struct Neighbour {
    distance_sq: f64,
    id: usize,
}

impl Eq for Neighbour {}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbour {
    // max-heap on distance, ties broken by id so results are reproducible
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.id.cmp(&other.id))
    }
}

#[derive(Debug)]
pub struct KDTree<'a> {
    points: Vec<&'a [f64]>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl<'a> KDTree<'a> {
    /// Build from borrowed rows; query results are positions in `points`.
    pub fn new(points: Vec<&'a [f64]>) -> Self {
        let mut ids: Vec<usize> = (0..points.len()).collect();
        let mut tree = KDTree {
            points,
            nodes: Vec::new(),
            root: None,
        };
        tree.root = tree.build_tree(&mut ids, 0);
        tree
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Recursively builds the KDTree and stores nodes in a flat vector.
    fn build_tree(&mut self, ids: &mut [usize], depth: usize) -> Option<usize> {
        if ids.is_empty() {
            return None;
        }
        let dims = self.points[ids[0]].len().max(1);
        let axis = depth % dims;
        let points = &self.points;
        ids.sort_by(|&a, &b| {
            let va = points[a].get(axis).copied().unwrap_or(0.0);
            let vb = points[b].get(axis).copied().unwrap_or(0.0);
            va.total_cmp(&vb).then(a.cmp(&b))
        });

        let mid = ids.len() / 2;
        let node_index = self.nodes.len();
        self.nodes.push(Node {
            id: ids[mid],
            axis,
            left: None,
            right: None,
        });

        let (lower, rest) = ids.split_at_mut(mid);
        let left = self.build_tree(lower, depth + 1);
        let right = self.build_tree(&mut rest[1..], depth + 1);
        self.nodes[node_index].left = left;
        self.nodes[node_index].right = right;
        Some(node_index)
    }

    /// The `k` closest points to `target`, closest first, as `(id, distance)`.
    pub fn k_nearest(&self, target: &[f64], k: usize) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = self.root {
            self.k_nearest_impl(root, target, k, &mut heap);
        }
        heap.into_sorted_vec()
            .into_iter()
            .map(|n| (n.id, n.distance_sq.sqrt()))
            .collect()
    }

    pub fn nearest(&self, target: &[f64]) -> Option<(usize, f64)> {
        self.k_nearest(target, 1).into_iter().next()
    }

    fn k_nearest_impl(
        &self,
        node_index: usize,
        target: &[f64],
        k: usize,
        heap: &mut BinaryHeap<Neighbour>,
    ) {
        let node = &self.nodes[node_index];
        let point = self.points[node.id];
        let candidate = Neighbour {
            distance_sq: squared_euclidean(target, point),
            id: node.id,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let diff = target.get(node.axis).copied().unwrap_or(0.0)
            - point.get(node.axis).copied().unwrap_or(0.0);
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.k_nearest_impl(near, target, k, heap);
        }
        if let Some(far) = far {
            // the splitting plane is closer than the current worst neighbour
            let must_visit = heap.len() < k
                || heap
                    .peek()
                    .is_some_and(|worst| diff * diff <= worst.distance_sq);
            if must_visit {
                self.k_nearest_impl(far, target, k, heap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(n: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..dim).map(|_| rng.random_range(0.0..1.0)).collect())
            .collect()
    }

    fn brute_force(points: &[Vec<f64>], target: &[f64], k: usize) -> Vec<usize> {
        let mut all: Vec<(f64, usize)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (squared_euclidean(p, target), i))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        all.into_iter().take(k).map(|(_, i)| i).collect()
    }

    #[test]
    fn k_nearest_matches_bruteforce_1d_2d_3d() {
        for (n, d, seed) in [(150, 1, 1u64), (200, 2, 2u64), (250, 3, 3u64)] {
            let points = random_points(n, d, seed);
            let tree = KDTree::new(points.iter().map(|p| p.as_slice()).collect());
            let queries = random_points(20, d, seed + 100);
            for q in &queries {
                let ids: Vec<usize> = tree.k_nearest(q, 5).into_iter().map(|(i, _)| i).collect();
                assert_eq!(ids, brute_force(&points, q, 5));
            }
        }
    }

    #[test]
    fn nearest_on_empty_tree_is_none() {
        let tree = KDTree::new(Vec::new());
        assert!(tree.nearest(&[0.0, 0.0]).is_none());
    }

    #[test]
    fn query_point_is_its_own_nearest_neighbour() {
        let points = random_points(50, 2, 9);
        let tree = KDTree::new(points.iter().map(|p| p.as_slice()).collect());
        for (i, p) in points.iter().enumerate() {
            assert_eq!(tree.nearest(p).map(|(id, _)| id), Some(i));
        }
    }
}
