use std::ops::Range;

use index_vec::{IndexVec, index_vec};
use itertools::Itertools as _;
use tracing::debug;

use crate::{
    geometry::{FloatType, WorldBox},
    scene::{InvalidSceneError, Scene, Sphere},
};

use super::{BvhNode, MAX_LEAF_PRIMITIVES, NodeIdx, SphereBvh};

impl SphereBvh {
    /// Builds the hierarchy top-down by splitting every node with more than
    /// `MAX_LEAF_PRIMITIVES` spheres at the middle of its largest axis.
    ///
    /// The build is deterministic: the same scene always produces the same nodes
    /// in the same order, and the same index permutation.
    pub fn build(scene: &Scene) -> Result<SphereBvh, InvalidSceneError> {
        let spheres = scene.spheres();
        if spheres.is_empty() {
            return Err(InvalidSceneError::Empty);
        }
        let _span = tracing::debug_span!("build_bvh", spheres = spheres.len()).entered();

        let mut builder = Builder::new(spheres);
        builder.update_bounds(NodeIdx::ROOT);

        // Explicit stack instead of recursion, degenerate inputs can make the tree
        // as deep as the number of spheres.
        // Right child is pushed first so that the nodes get allocated in the same
        // order as depth first recursion, left subtree first.
        let mut stack = vec![NodeIdx::ROOT];
        while let Some(node) = stack.pop() {
            if let Some((left, right)) = builder.subdivide(node) {
                stack.push(right);
                stack.push(left);
            }
        }

        debug!(
            nodes_used = builder.nodes_used,
            capacity = builder.nodes.len(),
            "BVH built"
        );

        Ok(SphereBvh {
            nodes: builder.nodes,
            nodes_used: builder.nodes_used,
            indices: builder.indices,
        })
    }
}

struct Builder<'a> {
    spheres: &'a [Sphere],
    nodes: IndexVec<NodeIdx, BvhNode>,
    nodes_used: usize,
    indices: Vec<u32>,
}

impl<'a> Builder<'a> {
    fn new(spheres: &'a [Sphere]) -> Self {
        // Scene guarantees that the count fits, see MAX_SPHERES
        let count = spheres.len() as u32;
        let mut nodes = index_vec![BvhNode::default(); 2 * spheres.len() - 1];
        nodes[NodeIdx::ROOT] = BvhNode {
            bounds: WorldBox::empty(),
            left_child_or_first_primitive: 0,
            primitive_count: count,
        };

        Builder {
            spheres,
            nodes,
            nodes_used: 1,
            indices: (0..count).collect(),
        }
    }

    fn range(&self, node: NodeIdx) -> Range<usize> {
        let node = &self.nodes[node];
        let first = node.left_child_or_first_primitive as usize;
        first..first + node.primitive_count as usize
    }

    fn sphere_at(&self, slot: usize) -> &'a Sphere {
        &self.spheres[self.indices[slot] as usize]
    }

    /// Recompute the node's box from the spheres it currently references.
    fn update_bounds(&mut self, node: NodeIdx) {
        let bounds = self
            .range(node)
            .map(|slot| self.sphere_at(slot).bounding_box())
            .fold(WorldBox::empty(), |acc, b| acc.union(&b));
        self.nodes[node].bounds = bounds;
    }

    /// Tries to split a leaf into two children.
    /// Returns the new children, or None if the node stays a leaf.
    fn subdivide(&mut self, node: NodeIdx) -> Option<(NodeIdx, NodeIdx)> {
        let count = self.nodes[node].primitive_count;
        if count <= MAX_LEAF_PRIMITIVES {
            return None;
        }

        let bounds = &self.nodes[node].bounds;
        let axis = bounds.largest_axis();
        let split_position = bounds.min[axis] + bounds.size()[axis] / 2.0;

        let range = self.range(node);
        let first = range.start;
        let before = cfg!(debug_assertions)
            .then(|| self.indices[range.clone()].iter().copied().sorted_unstable().collect_vec());
        let split_slot = self.partition(range.clone(), axis, split_position);
        if let Some(before) = before {
            // The permutation stays a bijection: only this node's own entries moved
            debug_assert!(self.indices[range].iter().copied().sorted_unstable().eq(before));
        }
        let left_count = (split_slot - first) as u32;

        if left_count == 0 || left_count == count {
            // Every center is on the same side of the split plane, there is
            // nothing to gain by splitting this node.
            return None;
        }

        let left = NodeIdx::from_usize(self.nodes_used);
        let right = left + 1;
        self.nodes_used += 2;

        self.nodes[left] = BvhNode {
            bounds: WorldBox::empty(),
            left_child_or_first_primitive: first as u32,
            primitive_count: left_count,
        };
        self.nodes[right] = BvhNode {
            bounds: WorldBox::empty(),
            left_child_or_first_primitive: split_slot as u32,
            primitive_count: count - left_count,
        };
        self.nodes[node].left_child_or_first_primitive = left.raw();
        self.nodes[node].primitive_count = 0;

        self.update_bounds(left);
        self.update_bounds(right);

        Some((left, right))
    }

    /// Reorders the index range in place so that spheres with center below
    /// `split_position` on `axis` come first.
    /// Returns the slot of the first sphere of the upper part.
    fn partition(&mut self, range: Range<usize>, axis: usize, split_position: FloatType) -> usize {
        let Range {
            start: mut low,
            end: mut high,
        } = range;

        while low < high {
            if self.sphere_at(low).center[axis] < split_position {
                low += 1;
            } else {
                high -= 1;
                self.indices.swap(low, high);
            }
        }

        low
    }
}
