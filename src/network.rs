//! Discrete-time simulation engine
//!
//! Drives the per-tick protocol over a set of policy-driven nodes:
//!
//! 1. **Decide**: every node processes at most one packet, in ascending
//!    node-id order, reading neighbor estimates from a tick-start snapshot.
//! 2. **Stage**: forwarded packets are collected per recipient; nothing is
//!    enqueued yet, so a packet crosses at most one edge per tick.
//! 3. **Advance**: the clock increments.
//! 4. **Deliver**: staged packets arrive at the new clock. Packets whose
//!    recipient is their destination go straight to the delivered sink;
//!    the rest join the recipient's queue for next tick.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::error::{SimError, SimResult};
use crate::node::{Node, ProcessOutcome};
use crate::routing::{EstimateSnapshot, PolicyKind, RoutingPolicy};
use crate::topology::Topology;
use crate::types::{DropReason, NetworkEvent, NodeId, Packet};

/// What to do with a packet whose policy found no next hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoRouteAction {
    /// Drop the packet and count it
    #[default]
    Drop,
    /// Put it back at the queue tail for re-decision next tick
    Requeue,
}

/// What to do when a bounded queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowAction {
    /// Discard the arriving packet (reject the injection)
    #[default]
    RejectNewest,
    /// Evict the queue head to make room
    DropOldest,
}

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seed for the engine's random source; equal seeds reproduce runs
    pub seed: u64,
    /// Per-node queue bound (`None` = unbounded, the classic model)
    pub queue_capacity: Option<usize>,
    /// Behavior when a bounded queue is full
    pub overflow: OverflowAction,
    /// Behavior when a policy reports no route
    pub no_route: NoRouteAction,
    /// Trace every network event as it is logged
    pub trace_routing: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            queue_capacity: None,
            overflow: OverflowAction::default(),
            no_route: NoRouteAction::default(),
            trace_routing: false,
        }
    }
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    pub packets_injected: u64,
    pub packets_delivered: u64,
    pub packets_dropped: u64,
    pub no_route_drops: u64,
    pub overflow_drops: u64,
    pub rejected_injections: u64,
    pub total_hops: u64,
    /// Sum of (delivery tick - creation tick) over delivered packets
    pub total_delivery_latency: u64,
}

impl SimStats {
    /// Mean delivery latency in ticks, if anything has been delivered
    pub fn mean_delivery_latency(&self) -> Option<f64> {
        if self.packets_delivered == 0 {
            None
        } else {
            Some(self.total_delivery_latency as f64 / self.packets_delivered as f64)
        }
    }
}

/// The simulated network: nodes, clock and delivered-packet sink
#[derive(Debug)]
pub struct Network {
    topology: Topology,
    nodes: BTreeMap<NodeId, Node>,
    clock: u64,
    /// Delivered packets since the last drain
    delivered: Vec<Packet>,
    /// Global event log
    pub event_log: Vec<NetworkEvent>,
    pub stats: SimStats,
    config: SimConfig,
    rng: StdRng,
}

impl Network {
    /// Create a network where every node runs the same kind of policy
    pub fn new(topology: Topology, kind: PolicyKind, config: SimConfig) -> Self {
        let policies = kind.build_all(&topology);
        Self::assemble(topology, policies, config)
    }

    /// Create a network with caller-supplied per-node policies
    pub fn with_policies<F>(topology: Topology, config: SimConfig, mut factory: F) -> Self
    where
        F: FnMut(NodeId, &Topology) -> Box<dyn RoutingPolicy>,
    {
        let policies = topology
            .node_ids()
            .into_iter()
            .map(|id| (id, factory(id, &topology)))
            .collect();
        Self::assemble(topology, policies, config)
    }

    fn assemble(
        topology: Topology,
        policies: BTreeMap<NodeId, Box<dyn RoutingPolicy>>,
        config: SimConfig,
    ) -> Self {
        let nodes = policies
            .into_iter()
            .map(|(id, policy)| {
                let neighbors = topology.neighbors(id);
                (id, Node::new(id, neighbors, policy))
            })
            .collect();
        let rng = StdRng::seed_from_u64(config.seed);
        info!(
            "network created: {} nodes, {} links",
            topology.node_count(),
            topology.edge_count()
        );
        Self {
            topology,
            nodes,
            clock: 0,
            delivered: Vec::new(),
            event_log: Vec::new(),
            stats: SimStats::default(),
            config,
            rng,
        }
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Inject a new packet at `src` addressed to `dst`
    pub fn inject(&mut self, src: NodeId, dst: NodeId) -> SimResult<()> {
        if src == dst {
            return Err(SimError::SelfAddressed(src));
        }
        if !self.nodes.contains_key(&src) {
            return Err(SimError::UnknownNode(src));
        }
        if !self.nodes.contains_key(&dst) {
            return Err(SimError::UnknownNode(dst));
        }

        if let Some(capacity) = self.config.queue_capacity
            && self.nodes[&src].queue_len() >= capacity
        {
            match self.config.overflow {
                OverflowAction::RejectNewest => {
                    self.stats.rejected_injections += 1;
                    return Err(SimError::QueueFull { node: src, capacity });
                }
                OverflowAction::DropOldest => self.evict_oldest(src),
            }
        }

        let packet = Packet::new(src, dst, self.clock);
        self.nodes.get_mut(&src).expect("validated above").receive(packet);
        self.stats.packets_injected += 1;
        self.emit_event(NetworkEvent::Injected {
            src,
            dst,
            tick: self.clock,
        });
        Ok(())
    }

    /// Inject a Poisson-like number of random packets for this tick
    ///
    /// `load` is the expected injection count: its integer part is always
    /// injected, the fractional remainder via a Bernoulli trial, so the
    /// mean over many ticks equals `load` exactly. Source and destination
    /// are a uniformly random ordered pair with `src != dst`. Returns the
    /// number of packets actually injected.
    pub fn inject_random_load(&mut self, load: f64) -> usize {
        if !(load > 0.0) || self.nodes.len() < 2 {
            return 0;
        }

        let mut count = load.floor() as usize;
        if self.rng.random::<f64>() < load - load.floor() {
            count += 1;
        }

        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        let mut injected = 0;
        for _ in 0..count {
            let src = ids[self.rng.random_range(0..ids.len())];
            let dst = loop {
                let candidate = ids[self.rng.random_range(0..ids.len())];
                if candidate != src {
                    break candidate;
                }
            };
            if self.inject(src, dst).is_ok() {
                injected += 1;
            }
        }
        injected
    }

    /// Run one tick of network activity
    pub fn tick(&mut self) {
        trace!("=== tick {} ===", self.clock);
        let estimates = self.snapshot_estimates();

        // Decide: fixed ascending node-id order, one packet per node
        let mut staged: BTreeMap<NodeId, Vec<Packet>> = BTreeMap::new();
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            let outcome = {
                let node = self.nodes.get_mut(&id).expect("node exists");
                node.process(self.clock, &estimates, &mut self.rng)
            };
            match outcome {
                ProcessOutcome::Idle => {}
                ProcessOutcome::Delivered(packet) => self.sink(packet),
                ProcessOutcome::Forward { next_hop, packet } => {
                    self.emit_event(NetworkEvent::Forwarded {
                        from: id,
                        to: next_hop,
                        dst: packet.dst,
                        tick: self.clock,
                    });
                    staged.entry(next_hop).or_default().push(packet);
                }
                ProcessOutcome::NoRoute(packet) => match self.config.no_route {
                    NoRouteAction::Drop => {
                        debug!("no route from {} to {}, dropping", id, packet.dst);
                        self.stats.packets_dropped += 1;
                        self.stats.no_route_drops += 1;
                        self.emit_event(NetworkEvent::Dropped {
                            node: id,
                            dst: packet.dst,
                            reason: DropReason::NoRoute,
                            tick: self.clock,
                        });
                    }
                    NoRouteAction::Requeue => {
                        self.nodes.get_mut(&id).expect("node exists").requeue(packet);
                    }
                },
            }
        }

        // Advance, then deliver: staged packets arrive at the new clock
        self.clock += 1;
        for (recipient, packets) in staged {
            for mut packet in packets {
                if packet.dst == recipient {
                    packet.delivered_at = Some(self.clock);
                    self.sink(packet);
                } else {
                    self.enqueue_in_flight(recipient, packet);
                }
            }
        }
    }

    /// Run `ticks` consecutive ticks
    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Invoke every policy's periodic hook with its node's queue length
    ///
    /// Called by the driver on its own cadence; the engine never calls it
    /// from `tick()`. Only the adaptive-temperature policy reacts.
    pub fn policy_tick_update(&mut self) {
        for node in self.nodes.values_mut() {
            node.tick_update();
        }
    }

    /// Sum of current queue lengths across all nodes
    pub fn active_packet_count(&self) -> usize {
        self.nodes.values().map(|n| n.queue_len()).sum()
    }

    /// Return and clear the packets delivered since the last call
    pub fn drain_delivered(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.delivered)
    }

    /// Freeze every node's per-destination best estimate
    ///
    /// All Decide-phase estimate reads go through this snapshot, so a
    /// node's update never observes a neighbor's same-tick mutations and
    /// results do not depend on iteration order.
    fn snapshot_estimates(&self) -> EstimateSnapshot {
        let mut snapshot = EstimateSnapshot::new();
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for node in self.nodes.values() {
            for dst in &ids {
                if *dst != node.id() {
                    snapshot.record(node.id(), *dst, node.estimate(*dst));
                }
            }
        }
        snapshot
    }

    fn sink(&mut self, packet: Packet) {
        let tick = packet.delivered_at.unwrap_or(self.clock);
        debug!(
            "packet {} -> {} delivered at tick {} ({} hops)",
            packet.src, packet.dst, tick, packet.hops
        );
        self.stats.packets_delivered += 1;
        self.stats.total_hops += packet.hops as u64;
        self.stats.total_delivery_latency += packet.latency().unwrap_or(0);
        self.emit_event(NetworkEvent::Delivered {
            src: packet.src,
            dst: packet.dst,
            created_at: packet.created_at,
            tick,
        });
        self.delivered.push(packet);
    }

    /// Enqueue an in-flight packet, applying the queue bound
    fn enqueue_in_flight(&mut self, recipient: NodeId, packet: Packet) {
        if let Some(capacity) = self.config.queue_capacity
            && self.nodes[&recipient].queue_len() >= capacity
        {
            match self.config.overflow {
                OverflowAction::RejectNewest => {
                    self.stats.packets_dropped += 1;
                    self.stats.overflow_drops += 1;
                    self.emit_event(NetworkEvent::Dropped {
                        node: recipient,
                        dst: packet.dst,
                        reason: DropReason::QueueFull,
                        tick: self.clock,
                    });
                    return;
                }
                OverflowAction::DropOldest => self.evict_oldest(recipient),
            }
        }
        self.nodes
            .get_mut(&recipient)
            .expect("staged recipient exists")
            .receive(packet);
    }

    fn evict_oldest(&mut self, node: NodeId) {
        if let Some(evicted) = self
            .nodes
            .get_mut(&node)
            .and_then(|n| n.evict_oldest())
        {
            self.stats.packets_dropped += 1;
            self.stats.overflow_drops += 1;
            self.emit_event(NetworkEvent::Dropped {
                node,
                dst: evicted.dst,
                reason: DropReason::QueueFull,
                tick: self.clock,
            });
        }
    }

    fn emit_event(&mut self, event: NetworkEvent) {
        if self.config.trace_routing {
            trace!("event: {event:?}");
        }
        self.event_log.push(event);
    }
}
