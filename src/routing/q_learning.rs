//! Q-Routing: online reinforcement estimation of delivery cost
//!
//! Every node keeps, for each destination, an estimated delivery cost
//! through each of its neighbors, initialized to zero. After forwarding a
//! packet the estimate for the chosen neighbor moves toward the observed
//! sample `local queue delay + 1 + neighbor's best estimate` with a fixed
//! learning rate. Neighbor estimates come from the engine's tick-start
//! snapshot, never from live in-tick state.

use std::collections::BTreeMap;

use rand::rngs::StdRng;

use crate::routing::{EstimateSnapshot, RoutingPolicy};
use crate::types::NodeId;

/// Learning rate used by the reference experiments
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Per-node learned cost table: destination -> (neighbor -> estimate)
#[derive(Debug)]
pub struct QTable {
    node: NodeId,
    neighbors: Vec<NodeId>,
    alpha: f64,
    q: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
}

impl QTable {
    /// Create a table covering every destination in the network
    pub fn new(node: NodeId, neighbors: Vec<NodeId>, destinations: Vec<NodeId>, alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "learning rate must be in (0, 1]");
        let q = destinations
            .into_iter()
            .filter(|dst| *dst != node)
            .map(|dst| {
                let entries = neighbors.iter().map(|n| (*n, 0.0)).collect();
                (dst, entries)
            })
            .collect();
        Self {
            node,
            neighbors,
            alpha,
            q,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    /// Estimates per neighbor for a destination, if the table knows it
    pub fn entries(&self, dst: NodeId) -> Option<&BTreeMap<NodeId, f64>> {
        self.q.get(&dst)
    }

    /// Neighbor with the lowest estimate for `dst`
    ///
    /// Ties break toward the lowest neighbor id so reruns with the same
    /// seed take identical paths.
    pub fn greedy(&self, dst: NodeId) -> Option<NodeId> {
        let entries = self.q.get(&dst)?;
        entries
            .iter()
            .fold(None::<(NodeId, f64)>, |best, (n, v)| match best {
                Some((_, bv)) if bv <= *v => best,
                _ => Some((*n, *v)),
            })
            .map(|(n, _)| n)
    }

    /// Move the (dst, via) estimate toward an observed cost sample
    pub fn update(&mut self, dst: NodeId, via: NodeId, queue_len: usize, estimates: &EstimateSnapshot) {
        let sample = queue_len as f64 + 1.0 + estimates.estimate(via, dst);
        if let Some(entry) = self.q.get_mut(&dst).and_then(|e| e.get_mut(&via)) {
            *entry += self.alpha * (sample - *entry);
        }
    }

    /// Best estimate toward `dst`, as exposed to neighbors
    pub fn best_estimate(&self, dst: NodeId) -> f64 {
        if dst == self.node {
            return 0.0;
        }
        self.q
            .get(&dst)
            .and_then(|entries| {
                entries
                    .values()
                    .copied()
                    .fold(None, |min, v| Some(min.map_or(v, |m| f64::min(m, v))))
            })
            .unwrap_or(f64::INFINITY)
    }

    pub fn value(&self, dst: NodeId, via: NodeId) -> Option<f64> {
        self.q.get(&dst).and_then(|entries| entries.get(&via)).copied()
    }
}

/// Greedy Q-Routing policy
#[derive(Debug)]
pub struct QPolicy {
    table: QTable,
}

impl QPolicy {
    pub fn new(node: NodeId, neighbors: Vec<NodeId>, destinations: Vec<NodeId>, alpha: f64) -> Self {
        Self {
            table: QTable::new(node, neighbors, destinations, alpha),
        }
    }
}

impl RoutingPolicy for QPolicy {
    fn next_hop(
        &mut self,
        dst: NodeId,
        queue_len: usize,
        estimates: &EstimateSnapshot,
        _rng: &mut StdRng,
    ) -> Option<NodeId> {
        let next = self.table.greedy(dst)?;
        self.table.update(dst, next, queue_len, estimates);
        Some(next)
    }

    fn estimate(&self, dst: NodeId) -> f64 {
        self.table.best_estimate(dst)
    }

    fn q_value(&self, dst: NodeId, via: NodeId) -> Option<f64> {
        self.table.value(dst, via)
    }
}
