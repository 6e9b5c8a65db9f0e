//! Forwarding policies
//!
//! The engine is policy-agnostic: every node owns a boxed [`RoutingPolicy`]
//! that picks next hops and maintains whatever local learning state it
//! needs. Four policies are provided:
//!
//! - [`StaticPolicy`]: precomputed shortest-path table lookup (Bellman-Ford)
//! - [`QPolicy`]: online Q-Routing, greedy over learned delivery estimates
//! - [`StochasticPolicy`]: softmax sampling over Q-values at fixed temperature
//! - [`AdaptivePolicy`]: softmax with temperature driven by the local queue trend
//! - [`RandomPolicy`]: uniform random neighbor, as a baseline

pub mod bellman_ford;
pub mod q_learning;
pub mod stochastic;

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;

use crate::topology::Topology;
use crate::types::NodeId;

pub use bellman_ford::{Route, RouteTables, StaticPolicy};
pub use q_learning::QPolicy;
pub use stochastic::{AdaptivePolicy, StochasticPolicy};

/// A per-node forwarding policy
///
/// Policies only ever see their own node's state plus the engine-provided
/// [`EstimateSnapshot`]; cross-node reads never touch live in-tick state.
pub trait RoutingPolicy: std::fmt::Debug + Send {
    /// Choose the next hop for a packet addressed to `dst`, updating any
    /// learning state as a side effect.
    ///
    /// `queue_len` is the local queue length immediately after the packet
    /// was dequeued. Returns `None` when no usable next hop exists; the
    /// engine turns that into an explicit no-route outcome.
    fn next_hop(
        &mut self,
        dst: NodeId,
        queue_len: usize,
        estimates: &EstimateSnapshot,
        rng: &mut StdRng,
    ) -> Option<NodeId>;

    /// Estimated delivery cost from this node to `dst`, exposed to
    /// neighbors via the snapshot. Policies without learned state report
    /// no reachable estimate.
    fn estimate(&self, _dst: NodeId) -> f64 {
        f64::INFINITY
    }

    /// Learned cost of reaching `dst` via a specific neighbor, where the
    /// policy keeps one. Inspection surface for callers and tests.
    fn q_value(&self, _dst: NodeId, _via: NodeId) -> Option<f64> {
        None
    }

    /// Periodic hook driven by the caller (not the engine) on its own
    /// cadence; `queue_len` is the node's current queue length.
    fn tick_update(&mut self, _queue_len: usize) {}
}

/// Per-destination best estimates of every node, frozen at tick start
///
/// Q-Routing updates read the forwarding neighbor's best estimate. Reading
/// it live during the Decide phase would make results depend on node
/// iteration order, so the engine snapshots all estimates before any node
/// processes and every read goes through the snapshot.
#[derive(Debug, Default)]
pub struct EstimateSnapshot {
    estimates: BTreeMap<(NodeId, NodeId), f64>,
}

impl EstimateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `node`'s estimate toward `dst`
    pub fn record(&mut self, node: NodeId, dst: NodeId, estimate: f64) {
        if estimate.is_finite() {
            self.estimates.insert((node, dst), estimate);
        }
    }

    /// Best estimate `node` reported toward `dst` at tick start
    ///
    /// A node's estimate toward itself is zero; unknown destinations are
    /// unreachable as far as the snapshot is concerned.
    pub fn estimate(&self, node: NodeId, dst: NodeId) -> f64 {
        if node == dst {
            return 0.0;
        }
        self.estimates
            .get(&(node, dst))
            .copied()
            .unwrap_or(f64::INFINITY)
    }
}

/// Uniform random forwarding, the zero-knowledge baseline
#[derive(Debug)]
pub struct RandomPolicy {
    neighbors: Vec<NodeId>,
}

impl RandomPolicy {
    pub fn new(neighbors: Vec<NodeId>) -> Self {
        Self { neighbors }
    }
}

impl RoutingPolicy for RandomPolicy {
    fn next_hop(
        &mut self,
        _dst: NodeId,
        _queue_len: usize,
        _estimates: &EstimateSnapshot,
        rng: &mut StdRng,
    ) -> Option<NodeId> {
        if self.neighbors.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.neighbors.len());
        Some(self.neighbors[idx])
    }
}

/// Which forwarding policy every node of a network runs
#[derive(Debug, Clone)]
pub enum PolicyKind {
    /// Precomputed Bellman-Ford shortest-path tables
    Static,
    /// Greedy Q-Routing with the given learning rate
    QLearned { alpha: f64 },
    /// Softmax Q-Routing at a fixed exploration temperature
    Stochastic { alpha: f64, temperature: f64 },
    /// Softmax Q-Routing with queue-trend-driven temperature
    AdaptiveStochastic { alpha: f64, history: usize },
    /// Uniform random forwarding
    Random,
}

impl PolicyKind {
    /// Greedy Q-Routing with the classic 0.5 learning rate
    pub fn q_learned() -> Self {
        Self::QLearned {
            alpha: q_learning::DEFAULT_ALPHA,
        }
    }

    /// Softmax Q-Routing with the default temperature
    pub fn stochastic() -> Self {
        Self::Stochastic {
            alpha: q_learning::DEFAULT_ALPHA,
            temperature: stochastic::DEFAULT_TEMPERATURE,
        }
    }

    /// Adaptive-temperature Q-Routing with the default history size
    pub fn adaptive() -> Self {
        Self::AdaptiveStochastic {
            alpha: q_learning::DEFAULT_ALPHA,
            history: stochastic::DEFAULT_HISTORY,
        }
    }

    /// Build one policy instance per node of the topology
    pub fn build_all(&self, topology: &Topology) -> BTreeMap<NodeId, Box<dyn RoutingPolicy>> {
        // Static tables are computed once per topology and shared
        let route_tables = match self {
            PolicyKind::Static => Some(Arc::new(RouteTables::compute(topology))),
            _ => None,
        };

        topology
            .node_ids()
            .into_iter()
            .map(|id| {
                let neighbors = topology.neighbors(id);
                let policy: Box<dyn RoutingPolicy> = match self {
                    PolicyKind::Static => {
                        Box::new(StaticPolicy::new(id, route_tables.clone().unwrap()))
                    }
                    PolicyKind::QLearned { alpha } => {
                        Box::new(QPolicy::new(id, neighbors, topology.node_ids(), *alpha))
                    }
                    PolicyKind::Stochastic { alpha, temperature } => Box::new(
                        StochasticPolicy::new(id, neighbors, topology.node_ids(), *alpha)
                            .with_temperature(*temperature),
                    ),
                    PolicyKind::AdaptiveStochastic { alpha, history } => Box::new(
                        AdaptivePolicy::new(id, neighbors, topology.node_ids(), *alpha, *history),
                    ),
                    PolicyKind::Random => Box::new(RandomPolicy::new(neighbors)),
                };
                (id, policy)
            })
            .collect()
    }
}
