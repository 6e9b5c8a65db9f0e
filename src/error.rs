//! Simulator error types

use thiserror::Error;

use crate::types::NodeId;

/// Errors surfaced by the simulation engine
///
/// Nothing here is fatal to a run: rejected operations leave the
/// simulation state untouched and the tick loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SimError {
    /// Injection with identical source and destination
    #[error("source and destination must differ (both {0})")]
    SelfAddressed(NodeId),

    /// Operation referenced a node id outside the topology
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Bounded queue at capacity and the overflow policy rejects new packets
    #[error("queue full at node {node} (capacity {capacity})")]
    QueueFull { node: NodeId, capacity: usize },
}

/// Result type for engine operations
pub type SimResult<T> = Result<T, SimError>;
