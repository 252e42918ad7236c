//! Immutable K-d tree for nearest-neighbour lookups in velocity space

use nalgebra::Vector3;

/// A node of the tree; `left` and `right` index into the node vector
#[derive(Debug, Clone, Copy)]
struct Node {
    split_axis: usize,
    point_index: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// K-d tree over a borrowed set of three-dimensional points
///
/// The tree stores indices only, so a query returns the position of the
/// nearest point in the slice it was built from.
#[derive(Debug, Clone)]
pub struct KdTree<'a> {
    points: &'a [Vector3<f64>],
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl<'a> KdTree<'a> {
    /// Build a balanced tree by median splits cycling through the axes
    pub fn build(points: &'a [Vector3<f64>]) -> Self {
        let mut tree = Self {
            points,
            nodes: Vec::with_capacity(points.len()),
            root: None,
        };
        let mut indices: Vec<usize> = (0..points.len()).collect();
        tree.root = tree.recursive_build(&mut indices, 0);
        tree
    }

    /// Number of indexed points
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the tree indexes no points
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the point closest to `query` in Euclidean distance
    ///
    /// Returns `None` for an empty tree or a query containing NaN.
    pub fn nearest(&self, query: &Vector3<f64>) -> Option<usize> {
        if query.iter().any(|c| c.is_nan()) {
            return None;
        }
        let mut best: Option<(usize, f64)> = None;
        if let Some(root) = self.root {
            self.recursive_nearest(root, query, &mut best);
        }
        best.map(|(index, _)| index)
    }

    fn coordinate(&self, point_index: usize, axis: usize) -> f64 {
        self.points
            .get(point_index)
            .and_then(|p| p.get(axis))
            .copied()
            .unwrap_or(f64::NAN)
    }

    fn recursive_build(&mut self, indices: &mut [usize], depth: usize) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }
        let split_axis = depth % 3;
        indices.sort_by(|&a, &b| {
            self.coordinate(a, split_axis)
                .total_cmp(&self.coordinate(b, split_axis))
        });

        let median = indices.len() / 2;
        let (lower, rest) = indices.split_at_mut(median);
        let (pivot, upper) = rest.split_first_mut()?;
        let point_index = *pivot;

        let left = self.recursive_build(lower, depth + 1);
        let right = self.recursive_build(upper, depth + 1);

        self.nodes.push(Node {
            split_axis,
            point_index,
            left,
            right,
        });
        Some(self.nodes.len() - 1)
    }

    fn recursive_nearest(
        &self,
        node_index: usize,
        query: &Vector3<f64>,
        best: &mut Option<(usize, f64)>,
    ) {
        let Some(node) = self.nodes.get(node_index).copied() else {
            return;
        };
        let Some(point) = self.points.get(node.point_index) else {
            return;
        };

        let distance_sq = (point - query).norm_squared();
        if best.is_none_or(|(_, d)| distance_sq < d) {
            *best = Some((node.point_index, distance_sq));
        }

        let offset = query.get(node.split_axis).copied().unwrap_or(0.0)
            - point.get(node.split_axis).copied().unwrap_or(0.0);
        let (near, far) = if offset < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.recursive_nearest(near, query, best);
        }
        // The far side can only help if the splitting plane is closer than the best match
        if let Some(far) = far {
            if best.is_none_or(|(_, d)| offset * offset < d) {
                self.recursive_nearest(far, query, best);
            }
        }
    }
}
