//! Policy-agnostic node shell
//!
//! A node owns its identity, its neighbor list, an inbound FIFO queue and
//! a boxed forwarding policy. During the Decide phase it processes at most
//! one packet; the engine handles staging and delivery.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use tracing::trace;

use crate::routing::{EstimateSnapshot, RoutingPolicy};
use crate::types::{NodeId, Packet};

/// Result of one node's Decide step
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Queue was empty
    Idle,
    /// Head packet was addressed to this node
    Delivered(Packet),
    /// Head packet goes one hop further
    Forward { next_hop: NodeId, packet: Packet },
    /// Policy found no usable next hop; the engine decides drop vs requeue
    NoRoute(Packet),
}

/// A node of the simulated network
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    neighbors: Vec<NodeId>,
    queue: VecDeque<Packet>,
    policy: Box<dyn RoutingPolicy>,
}

impl Node {
    pub fn new(id: NodeId, neighbors: Vec<NodeId>, policy: Box<dyn RoutingPolicy>) -> Self {
        Self {
            id,
            neighbors,
            queue: VecDeque::new(),
            policy,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Append a packet at the tail of the FIFO queue
    pub fn receive(&mut self, packet: Packet) {
        self.queue.push_back(packet);
    }

    /// Put a packet back at the tail for re-decision next tick
    pub fn requeue(&mut self, packet: Packet) {
        self.queue.push_back(packet);
    }

    /// Drop the head packet; used by the drop-oldest overflow policy
    pub fn evict_oldest(&mut self) -> Option<Packet> {
        self.queue.pop_front()
    }

    /// Process at most one packet this tick
    ///
    /// Pops the queue head. A packet addressed to this node is marked
    /// delivered at the current clock; anything else is handed to the
    /// policy for a next-hop decision. `estimates` carries every node's
    /// tick-start estimates, so policy updates never observe in-tick state.
    pub fn process(
        &mut self,
        clock: u64,
        estimates: &EstimateSnapshot,
        rng: &mut StdRng,
    ) -> ProcessOutcome {
        let Some(mut packet) = self.queue.pop_front() else {
            return ProcessOutcome::Idle;
        };

        if packet.dst == self.id {
            packet.delivered_at = Some(clock);
            return ProcessOutcome::Delivered(packet);
        }

        // Queue length after the dequeue is the waiting cost the policy
        // charges for routing through this node.
        let queue_len = self.queue.len();
        match self.policy.next_hop(packet.dst, queue_len, estimates, rng) {
            Some(next_hop) => {
                trace!("node {} forwards packet for {} via {}", self.id, packet.dst, next_hop);
                packet.hops += 1;
                ProcessOutcome::Forward { next_hop, packet }
            }
            None => ProcessOutcome::NoRoute(packet),
        }
    }

    /// This node's estimated delivery cost toward `dst`
    pub fn estimate(&self, dst: NodeId) -> f64 {
        if dst == self.id {
            return 0.0;
        }
        self.policy.estimate(dst)
    }

    /// Learned cost of reaching `dst` via `via`, for Q-family policies
    pub fn q_value(&self, dst: NodeId, via: NodeId) -> Option<f64> {
        self.policy.q_value(dst, via)
    }

    /// Forward the caller-driven periodic hook to the policy
    pub fn tick_update(&mut self) {
        let queue_len = self.queue.len();
        self.policy.tick_update(queue_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RandomPolicy;
    use rand::SeedableRng;

    fn node() -> Node {
        Node::new(
            NodeId(1),
            vec![NodeId(0), NodeId(2)],
            Box::new(RandomPolicy::new(vec![NodeId(0), NodeId(2)])),
        )
    }

    #[test]
    fn test_empty_queue_is_idle() {
        let mut node = node();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            node.process(0, &EstimateSnapshot::new(), &mut rng),
            ProcessOutcome::Idle
        ));
    }

    #[test]
    fn test_local_delivery_sets_tick() {
        let mut node = node();
        let mut rng = StdRng::seed_from_u64(0);
        node.receive(Packet::new(NodeId(0), NodeId(1), 2));

        match node.process(5, &EstimateSnapshot::new(), &mut rng) {
            ProcessOutcome::Delivered(packet) => {
                assert_eq!(packet.delivered_at, Some(5));
                assert_eq!(packet.created_at, 2);
            }
            other => panic!("expected delivery, got {other:?}"),
        }
        assert_eq!(node.queue_len(), 0);
    }

    #[test]
    fn test_fifo_order() {
        let mut node = node();
        let mut rng = StdRng::seed_from_u64(0);
        node.receive(Packet::new(NodeId(0), NodeId(2), 0));
        node.receive(Packet::new(NodeId(2), NodeId(0), 1));

        match node.process(3, &EstimateSnapshot::new(), &mut rng) {
            ProcessOutcome::Forward { packet, .. } => assert_eq!(packet.created_at, 0),
            other => panic!("expected forward, got {other:?}"),
        }
        match node.process(4, &EstimateSnapshot::new(), &mut rng) {
            ProcessOutcome::Forward { packet, .. } => assert_eq!(packet.created_at, 1),
            other => panic!("expected forward, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_counts_hop() {
        let mut node = node();
        let mut rng = StdRng::seed_from_u64(0);
        node.receive(Packet::new(NodeId(0), NodeId(2), 0));

        match node.process(1, &EstimateSnapshot::new(), &mut rng) {
            ProcessOutcome::Forward { packet, next_hop } => {
                assert_eq!(packet.hops, 1);
                assert!(node.neighbors().contains(&next_hop));
            }
            other => panic!("expected forward, got {other:?}"),
        }
    }
}
