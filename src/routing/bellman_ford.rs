//! Static shortest-path routing
//!
//! Bellman-Ford relaxation over the full topology, run once per node as
//! source before the simulation starts. Weights are non-negative, so
//! |V|-1 relaxation rounds are sufficient and no negative-cycle check is
//! needed. Destinations the relaxation never reaches get no table entry;
//! lookups surface that as an explicit no-route result instead of failing.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::routing::{EstimateSnapshot, RoutingPolicy};
use crate::topology::Topology;
use crate::types::NodeId;

/// A precomputed route toward one destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    /// Total path cost from the table's source node
    pub cost: f64,
    /// Neighbor to forward to
    pub next_hop: NodeId,
}

/// Shortest-path routing tables for every node of a topology
///
/// Immutable after construction; lookups are safe from any tick.
#[derive(Debug)]
pub struct RouteTables {
    tables: BTreeMap<NodeId, BTreeMap<NodeId, Route>>,
}

/// Single-source relaxation: distances and predecessors from `source`
///
/// Unreachable nodes keep an infinite distance and no predecessor entry.
pub fn shortest_paths(
    topology: &Topology,
    source: NodeId,
) -> (BTreeMap<NodeId, f64>, BTreeMap<NodeId, NodeId>) {
    let mut distances: BTreeMap<NodeId, f64> = topology
        .node_ids()
        .into_iter()
        .map(|id| (id, f64::INFINITY))
        .collect();
    let mut predecessors: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    distances.insert(source, 0.0);

    for _ in 1..topology.node_count() {
        for (u, v, weight) in topology.edges() {
            let through = distances[&u] + weight;
            if through < distances[&v] {
                distances.insert(v, through);
                predecessors.insert(v, u);
            }
        }
    }

    (distances, predecessors)
}

impl RouteTables {
    /// Compute the full table set, one Bellman-Ford pass per source
    pub fn compute(topology: &Topology) -> Self {
        let mut tables = BTreeMap::new();

        for source in topology.node_ids() {
            let (distances, predecessors) = shortest_paths(topology, source);
            let mut table = BTreeMap::new();

            for dst in topology.node_ids() {
                if dst == source || !distances[&dst].is_finite() {
                    continue;
                }
                // Walk the predecessor chain back until the hop whose
                // predecessor is the source itself.
                let mut hop = dst;
                while let Some(&pred) = predecessors.get(&hop) {
                    if pred == source {
                        break;
                    }
                    hop = pred;
                }
                table.insert(
                    dst,
                    Route {
                        cost: distances[&dst],
                        next_hop: hop,
                    },
                );
            }

            tables.insert(source, table);
        }

        Self { tables }
    }

    /// Route from `src` toward `dst`, or `None` when `dst` is unreachable
    pub fn lookup(&self, src: NodeId, dst: NodeId) -> Option<&Route> {
        self.tables.get(&src)?.get(&dst)
    }
}

/// Table-lookup forwarding over a shared precomputed [`RouteTables`]
#[derive(Debug)]
pub struct StaticPolicy {
    node: NodeId,
    routes: Arc<RouteTables>,
}

impl StaticPolicy {
    pub fn new(node: NodeId, routes: Arc<RouteTables>) -> Self {
        Self { node, routes }
    }
}

impl RoutingPolicy for StaticPolicy {
    fn next_hop(
        &mut self,
        dst: NodeId,
        _queue_len: usize,
        _estimates: &EstimateSnapshot,
        _rng: &mut StdRng,
    ) -> Option<NodeId> {
        self.routes.lookup(self.node, dst).map(|route| route.next_hop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{TopologyBuilder, from_edges};

    #[test]
    fn test_prefers_cheap_two_hop_path() {
        // A-B weight 1, B-C weight 1, A-C weight 5: best A->C is 2 via B
        let topology = from_edges(&[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 5.0)]);
        let tables = RouteTables::compute(&topology);

        let route = tables.lookup(NodeId(0), NodeId(2)).unwrap();
        assert_eq!(route.cost, 2.0);
        assert_eq!(route.next_hop, NodeId(1));
    }

    #[test]
    fn test_adjacent_destination() {
        let topology = TopologyBuilder::new(3).line();
        let tables = RouteTables::compute(&topology);

        let route = tables.lookup(NodeId(0), NodeId(1)).unwrap();
        assert_eq!(route.cost, 1.0);
        assert_eq!(route.next_hop, NodeId(1));
    }

    #[test]
    fn test_multi_hop_next_hop_is_first_edge() {
        let topology = TopologyBuilder::new(5).line();
        let tables = RouteTables::compute(&topology);

        let route = tables.lookup(NodeId(0), NodeId(4)).unwrap();
        assert_eq!(route.cost, 4.0);
        assert_eq!(route.next_hop, NodeId(1));
    }

    #[test]
    fn test_disconnected_destination_has_no_route() {
        // Two disjoint components: 0-1 and 2-3
        let topology = from_edges(&[(0, 1, 1.0), (2, 3, 1.0)]);
        let tables = RouteTables::compute(&topology);

        assert!(tables.lookup(NodeId(0), NodeId(2)).is_none());
        assert!(tables.lookup(NodeId(0), NodeId(1)).is_some());
    }

    #[test]
    fn test_shortest_paths_distances() {
        let topology = from_edges(&[(0, 1, 2.0), (1, 2, 3.0), (0, 2, 10.0)]);
        let (distances, _) = shortest_paths(&topology, NodeId(0));

        assert_eq!(distances[&NodeId(0)], 0.0);
        assert_eq!(distances[&NodeId(1)], 2.0);
        assert_eq!(distances[&NodeId(2)], 5.0);
    }
}
