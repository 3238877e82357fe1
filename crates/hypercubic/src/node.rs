use crate::dataframe::Dataset;
use crate::hypercube::HyperCube;

/// One region of the recursive partition: a cube plus the rows it owns.
#[derive(Clone, Debug)]
pub struct Node {
    pub cube: HyperCube,
    pub indices: Vec<usize>,
    pub depth: usize,
    /// Position in a complete binary numbering (root = 1), stable across build orders.
    pub path: u64,
    pub parent: Option<usize>,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl Node {
    pub fn root(cube: HyperCube, indices: Vec<usize>) -> Self {
        Self {
            cube,
            indices,
            depth: 0,
            path: 1,
            parent: None,
            left: None,
            right: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Mean deviation of the cube output over the owned rows, zero when undefined.
    pub fn error(&self, data: &Dataset) -> f64 {
        self.cube.error(data, &self.indices).unwrap_or(0.0)
    }
}

/// Binary partition tree stored as an arena; children are referenced by index.
#[derive(Clone, Debug)]
pub struct PartitionTree {
    nodes: Vec<Node>,
}

impl PartitionTree {
    pub fn new(root: Node) -> Self {
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Hang `left` and `right` under `parent`, returning their indices.
    pub fn attach(&mut self, parent: usize, mut left: Node, mut right: Node) -> (usize, usize) {
        let depth = self.nodes[parent].depth + 1;
        let path = self.nodes[parent].path;
        for (child, offset) in [(&mut left, 0u64), (&mut right, 1u64)] {
            child.depth = depth;
            child.path = path.wrapping_mul(2).wrapping_add(offset);
            child.parent = Some(parent);
            child.left = None;
            child.right = None;
        }
        let left_index = self.nodes.len();
        self.nodes.push(left);
        let right_index = self.nodes.len();
        self.nodes.push(right);
        self.nodes[parent].left = Some(left_index);
        self.nodes[parent].right = Some(right_index);
        (left_index, right_index)
    }

    /// Leaf indices in rule order: depth first, right child before left.
    ///
    /// A right child is the inner region carved out of its parent, so it has to be
    /// matched before the left sibling that keeps the parent's bounds.
    pub fn leaves(&self) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                leaves.push(index);
                continue;
            }
            // pushed in reverse so the right child is visited first
            if let Some(left) = node.left {
                stack.push(left);
            }
            if let Some(right) = node.right {
                stack.push(right);
            }
        }
        leaves
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Leaf cubes in rule order.
    pub fn into_cubes(self) -> Vec<HyperCube> {
        let order = self.leaves();
        let mut slots: Vec<Option<Node>> = self.nodes.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|i| slots[i].take().map(|n| n.cube))
            .collect()
    }
}
