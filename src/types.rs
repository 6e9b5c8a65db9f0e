//! Core types for the routing simulator
//!
//! Models a network of numbered nodes exchanging packets over weighted
//! links, one forwarding decision per node per tick.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the network (non-negative integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A packet in flight through the simulated network
///
/// Created by injection, owned by exactly one node's queue at a time,
/// and handed to the delivered sink once it reaches its destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    /// Node that injected the packet
    pub src: NodeId,
    /// Final destination
    pub dst: NodeId,
    /// Tick at which the packet was injected
    pub created_at: u64,
    /// Tick at which the packet reached its destination (unset until then)
    pub delivered_at: Option<u64>,
    /// Number of edges traversed so far
    pub hops: u32,
}

impl Packet {
    pub fn new(src: NodeId, dst: NodeId, tick: u64) -> Self {
        Self {
            src,
            dst,
            created_at: tick,
            delivered_at: None,
            hops: 0,
        }
    }

    /// Delivery latency in ticks, if the packet has been delivered
    pub fn latency(&self) -> Option<u64> {
        self.delivered_at
            .map(|t| t.saturating_sub(self.created_at))
    }
}

/// Events that occur in the network simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NetworkEvent {
    /// Packet injected at its source node
    Injected {
        src: NodeId,
        dst: NodeId,
        tick: u64,
    },
    /// Packet forwarded one hop
    Forwarded {
        from: NodeId,
        to: NodeId,
        dst: NodeId,
        tick: u64,
    },
    /// Packet reached its destination
    Delivered {
        src: NodeId,
        dst: NodeId,
        created_at: u64,
        tick: u64,
    },
    /// Packet dropped
    Dropped {
        node: NodeId,
        dst: NodeId,
        reason: DropReason,
        tick: u64,
    },
}

/// Why a packet was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// No usable next hop toward the destination
    NoRoute,
    /// Queue at capacity and the overflow policy discarded a packet
    QueueFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_latency() {
        let mut packet = Packet::new(NodeId(0), NodeId(2), 3);
        assert_eq!(packet.latency(), None);

        packet.delivered_at = Some(7);
        assert_eq!(packet.latency(), Some(4));
    }

    #[test]
    fn test_node_id_ordering() {
        assert!(NodeId(1) < NodeId(2));
        assert_eq!(NodeId::from(5), NodeId(5));
    }
}
