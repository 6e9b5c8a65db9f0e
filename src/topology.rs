//! Weighted network topologies
//!
//! Provides the adjacency description the engine and the static route
//! precomputation both consume: node id -> list of (neighbor, weight).
//! Builders for common shapes (line, ring, full mesh, star) plus a
//! weighted edge-list constructor. The topology is immutable for the
//! duration of a simulation run.

use std::collections::BTreeMap;

use crate::types::NodeId;

/// A weighted, undirected network topology
///
/// `connect` always inserts both directions, so graphs built through this
/// type are symmetric. The engine itself never enforces symmetry; callers
/// assembling adjacency by hand are responsible for it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Adjacency: node -> ordered list of (neighbor, weight)
    adjacency: BTreeMap<NodeId, Vec<(NodeId, f64)>>,
}

impl Topology {
    /// Create an empty topology
    pub fn new() -> Self {
        Self {
            adjacency: BTreeMap::new(),
        }
    }

    /// Add a node with no links
    pub fn add_node(&mut self, id: NodeId) {
        self.adjacency.entry(id).or_default();
    }

    /// Add a bidirectional link between two nodes
    ///
    /// Weights must be non-negative; the static shortest-path
    /// precomputation relies on that.
    pub fn connect(&mut self, a: NodeId, b: NodeId, weight: f64) {
        assert!(weight >= 0.0, "link weights must be non-negative");
        if a == b {
            return; // No self-loops
        }

        self.add_node(a);
        self.add_node(b);

        let a_links = self.adjacency.get_mut(&a).unwrap();
        if !a_links.iter().any(|(n, _)| *n == b) {
            a_links.push((b, weight));
        }
        let b_links = self.adjacency.get_mut(&b).unwrap();
        if !b_links.iter().any(|(n, _)| *n == a) {
            b_links.push((a, weight));
        }
    }

    /// Get the weighted links of a node
    pub fn links(&self, node: NodeId) -> &[(NodeId, f64)] {
        self.adjacency
            .get(&node)
            .map(|links| links.as_slice())
            .unwrap_or(&[])
    }

    /// Get the neighbor ids of a node, in insertion order
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.links(node).iter().map(|(n, _)| *n).collect()
    }

    /// Check if two nodes are directly connected
    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.links(a).iter().any(|(n, _)| *n == b)
    }

    /// All node ids, ascending
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.adjacency.keys().copied().collect()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected links
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|links| links.len()).sum::<usize>() / 2
    }

    /// Iterate all directed edges as (from, to, weight)
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, f64)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(u, links)| links.iter().map(|(v, w)| (*u, *v, *w)))
    }
}

/// Create a topology from a weighted edge list
pub fn from_edges(edges: &[(u32, u32, f64)]) -> Topology {
    let mut topology = Topology::new();
    for (a, b, weight) in edges {
        topology.connect(NodeId(*a), NodeId(*b), *weight);
    }
    topology
}

/// Builder for common topologies with unit-weight links
pub struct TopologyBuilder {
    node_count: usize,
}

impl TopologyBuilder {
    /// Create a builder for `node_count` nodes numbered 0..node_count
    pub fn new(node_count: usize) -> Self {
        assert!(node_count >= 2, "a topology needs at least 2 nodes");
        Self { node_count }
    }

    /// Line topology: 0 - 1 - 2 - ...
    pub fn line(self) -> Topology {
        let mut topology = Topology::new();
        for i in 0..(self.node_count - 1) {
            topology.connect(NodeId(i as u32), NodeId(i as u32 + 1), 1.0);
        }
        topology
    }

    /// Ring topology: 0 - 1 - ... - n-1 - 0
    pub fn ring(self) -> Topology {
        let mut topology = Topology::new();
        for i in 0..self.node_count {
            let next = (i + 1) % self.node_count;
            topology.connect(NodeId(i as u32), NodeId(next as u32), 1.0);
        }
        topology
    }

    /// Full mesh: every node connected to every other
    pub fn full_mesh(self) -> Topology {
        let mut topology = Topology::new();
        for i in 0..self.node_count {
            for j in (i + 1)..self.node_count {
                topology.connect(NodeId(i as u32), NodeId(j as u32), 1.0);
            }
        }
        topology
    }

    /// Star topology: node 0 in the center, connected to all others
    pub fn star(self) -> Topology {
        let mut topology = Topology::new();
        for i in 1..self.node_count {
            topology.connect(NodeId(0), NodeId(i as u32), 1.0);
        }
        topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_topology() {
        let topology = TopologyBuilder::new(4).ring();
        assert_eq!(topology.node_count(), 4);
        assert_eq!(topology.edge_count(), 4);

        assert!(topology.are_connected(NodeId(0), NodeId(1)));
        assert!(topology.are_connected(NodeId(3), NodeId(0))); // Wrap around
        assert!(!topology.are_connected(NodeId(0), NodeId(2)));
    }

    #[test]
    fn test_full_mesh() {
        let topology = TopologyBuilder::new(4).full_mesh();
        assert_eq!(topology.edge_count(), 6); // C(4,2) = 6

        for a in topology.node_ids() {
            for b in topology.node_ids() {
                if a != b {
                    assert!(topology.are_connected(a, b));
                }
            }
        }
    }

    #[test]
    fn test_weighted_edges() {
        let topology = from_edges(&[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 5.0)]);

        assert_eq!(topology.node_count(), 3);
        assert_eq!(topology.links(NodeId(0)), &[(NodeId(1), 1.0), (NodeId(2), 5.0)]);
        assert_eq!(topology.neighbors(NodeId(1)), vec![NodeId(0), NodeId(2)]);
    }

    #[test]
    fn test_connect_ignores_self_loops_and_duplicates() {
        let mut topology = Topology::new();
        topology.connect(NodeId(0), NodeId(0), 1.0);
        assert_eq!(topology.node_count(), 0);

        topology.connect(NodeId(0), NodeId(1), 1.0);
        topology.connect(NodeId(1), NodeId(0), 2.0); // Duplicate, ignored
        assert_eq!(topology.edge_count(), 1);
        assert_eq!(topology.links(NodeId(0)), &[(NodeId(1), 1.0)]);
    }
}
