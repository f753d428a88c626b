use std::fmt::Display;

use tracing::info;

use crate::util::Stats;

use super::{NodeIdx, NodeKind, SphereBvh};

/// Shape summary of a built tree.
#[derive(Clone, Debug, PartialEq)]
pub struct BvhStatistics {
    pub nodes_used: usize,
    pub capacity: usize,
    /// Depth of the leaves, the root alone has depth 1
    pub leaf_depth: Stats,
    /// Number of spheres per leaf
    pub leaf_fill: Stats,
}

impl SphereBvh {
    pub fn statistics(&self) -> BvhStatistics {
        // (depth, sphere count) of every leaf
        let mut leaves = Vec::new();

        let mut stack = vec![(NodeIdx::ROOT, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            match self.node(index).kind() {
                NodeKind::Inner { left, right } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
                NodeKind::Leaf { indices } => leaves.push((depth, indices.len())),
            }
        }

        BvhStatistics {
            nodes_used: self.nodes_used,
            capacity: self.capacity(),
            leaf_depth: leaves.iter().map(|&(depth, _)| depth).collect(),
            leaf_fill: leaves.iter().map(|&(_, fill)| fill).collect(),
        }
    }

    pub fn log_statistics(&self) {
        let stats = self.statistics();
        info!(
            nodes_used = stats.nodes_used,
            capacity = stats.capacity,
            "BVH depth: {}",
            stats.leaf_depth
        );
        info!("BVH leaf fill: {}", stats.leaf_fill);
    }

    pub fn print_tree(&self) {
        let mut stack = vec![(NodeIdx::ROOT, 0usize)];
        while let Some((index, indent)) = stack.pop() {
            let node = self.node(index);
            let indent_str = "  ".repeat(indent);
            match node.kind() {
                NodeKind::Inner { left, right } => {
                    println!(
                        "{}- I{}: {:?}-{:?}",
                        indent_str,
                        index.index(),
                        node.bounds.min,
                        node.bounds.max,
                    );
                    stack.push((right, indent + 1));
                    stack.push((left, indent + 1));
                }
                NodeKind::Leaf { indices } => {
                    println!(
                        "{}- L{}: {:?}-{:?} spheres {:?}",
                        indent_str,
                        index.index(),
                        node.bounds.min,
                        node.bounds.max,
                        &self.indices[indices],
                    );
                }
            }
        }
    }
}

impl Display for BvhStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Nodes: {} of {}", self.nodes_used, self.capacity)?;
        writeln!(f, "Depth: {}", self.leaf_depth)?;
        write!(f, "Leaf nodes fill: {}", self.leaf_fill)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::presets::Preset;
    use assert2::assert;

    #[test]
    fn three_spheres_statistics() {
        let scene = Preset::ThreeSpheres.scene().unwrap();
        let stats = SphereBvh::build(&scene).unwrap().statistics();

        assert!(stats.nodes_used == 5);
        assert!(stats.capacity == 7);

        assert!(stats.leaf_depth.count == 3);
        assert!(stats.leaf_depth.min == 2);
        assert!(stats.leaf_depth.max == 3);

        assert!(stats.leaf_fill.count == 3);
        assert!(stats.leaf_fill.min == 1);
        assert!(stats.leaf_fill.max == 2);
    }

    #[test]
    fn leaf_fill_covers_all_spheres() {
        let scene = Preset::Random { seed: Some(1) }.scene().unwrap();
        let stats = SphereBvh::build(&scene).unwrap().statistics();

        assert!(stats.leaf_fill.sum == scene.len());
    }

    #[test]
    fn display_lists_all_parts() {
        let scene = Preset::Lights.scene().unwrap();
        let output = SphereBvh::build(&scene).unwrap().statistics().to_string();
        assert!(output.contains("Nodes: "));
        assert!(output.contains("Depth: "));
        assert!(output.contains("Leaf nodes fill: "));
    }
}
