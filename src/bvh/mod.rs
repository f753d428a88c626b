mod building;
mod printing;

use std::ops::Range;

use index_vec::IndexVec;

use crate::geometry::WorldBox;

pub use printing::BvhStatistics;

/// Nodes with at most this many spheres are never split.
pub const MAX_LEAF_PRIMITIVES: u32 = 2;

/// Binary BVH over the spheres of a scene, stored as a flat arena.
///
/// Children of an inner node are always allocated next to each other, so only
/// the left child index is stored and the right child is `left + 1`.
/// Leaves reference a consecutive range of `indices`, which in turn holds
/// indices into the scene's sphere list.
#[derive(Clone, Debug)]
pub struct SphereBvh {
    /// Allocated with capacity for a full binary tree (2N - 1 nodes),
    /// only the first `nodes_used` are part of the tree.
    nodes: IndexVec<NodeIdx, BvhNode>,
    nodes_used: usize,

    indices: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BvhNode {
    pub bounds: WorldBox,
    /// Left child for inner nodes, first entry in the index permutation for leaves
    pub left_child_or_first_primitive: u32,
    /// Zero for inner nodes
    pub primitive_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Inner { left: NodeIdx, right: NodeIdx },
    Leaf { indices: Range<usize> },
}

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

impl NodeIdx {
    pub const ROOT: NodeIdx = NodeIdx::from_raw_unchecked(0);
}

impl BvhNode {
    pub fn kind(&self) -> NodeKind {
        if self.primitive_count == 0 {
            let left = NodeIdx::from_raw(self.left_child_or_first_primitive);
            NodeKind::Inner {
                left,
                right: left + 1,
            }
        } else {
            let first = self.left_child_or_first_primitive as usize;
            NodeKind::Leaf {
                indices: first..first + self.primitive_count as usize,
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.primitive_count > 0
    }
}

impl SphereBvh {
    /// The populated part of the node arena, root first.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes.raw[..self.nodes_used]
    }

    pub fn node(&self, index: NodeIdx) -> &BvhNode {
        debug_assert!(index.index() < self.nodes_used);
        &self.nodes[index]
    }

    pub fn nodes_used(&self) -> usize {
        self.nodes_used
    }

    /// Number of node slots allocated for the tree, always 2N - 1.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Permutation of sphere indices, leaves reference ranges of it.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn sphere_count(&self) -> usize {
        self.indices.len()
    }

    pub fn bounding_box(&self) -> &WorldBox {
        &self.nodes[NodeIdx::ROOT].bounds
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::{assert, let_assert};

    #[test]
    fn inner_node_kind() {
        let node = BvhNode {
            bounds: WorldBox::default(),
            left_child_or_first_primitive: 3,
            primitive_count: 0,
        };
        let_assert!(NodeKind::Inner { left, right } = node.kind());
        assert!(left.raw() == 3);
        assert!(right.raw() == 4);
        assert!(!node.is_leaf());
    }

    #[test]
    fn leaf_node_kind() {
        let node = BvhNode {
            bounds: WorldBox::default(),
            left_child_or_first_primitive: 7,
            primitive_count: 2,
        };
        assert!(node.kind() == NodeKind::Leaf { indices: 7..9 });
        assert!(node.is_leaf());
    }
}
