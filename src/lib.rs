//! # qroute-sim
//!
//! A discrete-time simulator of packet routing over a weighted graph,
//! built to study how per-node forwarding policies behave under varying
//! offered load.
//!
//! ## Overview
//!
//! The network is a closed, single-process model of logical time: a
//! global clock, one forwarding decision per node per tick, and a
//! synchronous stage-then-deliver step so packets cross at most one edge
//! per tick. Policies are pluggable per node:
//!
//! - **Static**: table lookup over Bellman-Ford shortest paths,
//!   precomputed once per topology
//! - **Q-Routing**: online reinforcement estimates of delivery cost,
//!   updated after every forwarding decision
//! - **Stochastic**: softmax sampling over Q-values at fixed temperature
//! - **Adaptive**: softmax with temperature driven by the local queue
//!   trend, so congested nodes explore harder
//!
//! ## Architecture
//!
//! - **Types** (`types.rs`): core data structures (NodeId, Packet, events)
//! - **Topology** (`topology.rs`): weighted adjacency and builders
//! - **Routing** (`routing/`): the policy trait and its four implementations
//! - **Node** (`node.rs`): policy-agnostic queue-and-forward shell
//! - **Network** (`network.rs`): tick engine, injection, metrics
//!
//! ## Example
//!
//! ```rust
//! use qroute_sim::{Network, NodeId, PolicyKind, SimConfig, TopologyBuilder};
//!
//! // 0 - 1 - 2 line, static shortest-path forwarding
//! let topology = TopologyBuilder::new(3).line();
//! let mut network = Network::new(topology, PolicyKind::Static, SimConfig::default());
//!
//! network.inject(NodeId(0), NodeId(2)).unwrap();
//! network.tick(); // hop 0 -> 1
//! network.tick(); // hop 1 -> 2, delivered on arrival
//!
//! let delivered = network.drain_delivered();
//! assert_eq!(delivered[0].delivered_at, Some(2));
//! ```
//!
//! Estimate queries between nodes always read a tick-start snapshot, so
//! runs with the same seed are reproducible regardless of how the Decide
//! phase might be parallelized.

pub mod error;
pub mod network;
pub mod node;
pub mod routing;
pub mod topology;
pub mod types;

#[cfg(test)]
mod integration_scenarios;

// Re-export main types
pub use error::{SimError, SimResult};
pub use network::{Network, NoRouteAction, OverflowAction, SimConfig, SimStats};
pub use node::{Node, ProcessOutcome};
pub use routing::{
    AdaptivePolicy, EstimateSnapshot, PolicyKind, QPolicy, RandomPolicy, Route, RouteTables,
    RoutingPolicy, StaticPolicy, StochasticPolicy,
};
pub use topology::{Topology, TopologyBuilder, from_edges};
pub use types::{DropReason, NetworkEvent, NodeId, Packet};
