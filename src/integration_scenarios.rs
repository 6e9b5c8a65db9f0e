//! End-to-end scenarios exercising the full engine/policy stack

use crate::network::{Network, SimConfig};
use crate::routing::{PolicyKind, RouteTables};
use crate::topology::{TopologyBuilder, from_edges};
use crate::types::{NetworkEvent, NodeId};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn seeded(seed: u64) -> SimConfig {
    SimConfig {
        seed,
        ..Default::default()
    }
}

/// Static routing takes the cheap two-hop path, not the heavy direct edge
#[test]
fn test_static_routing_avoids_heavy_edge() {
    init_tracing();
    let topology = from_edges(&[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 5.0)]);
    let mut network = Network::new(topology, PolicyKind::Static, SimConfig::default());

    network.inject(NodeId(0), NodeId(2)).unwrap();
    network.run_ticks(2);

    let delivered = network.drain_delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].hops, 2);

    // The first hop went to node 1, never across the weight-5 edge
    let first_forward = network
        .event_log
        .iter()
        .find_map(|event| match event {
            NetworkEvent::Forwarded { from, to, .. } if *from == NodeId(0) => Some(*to),
            _ => None,
        })
        .unwrap();
    assert_eq!(first_forward, NodeId(1));
}

/// Same seed, same run: event logs and stats are identical
#[test]
fn test_runs_are_reproducible() {
    init_tracing();
    let run = |seed: u64| {
        let topology = TopologyBuilder::new(5).ring();
        let mut network = Network::new(topology, PolicyKind::stochastic(), seeded(seed));
        for _ in 0..100 {
            network.inject_random_load(0.7);
            network.tick();
        }
        (
            network.stats.packets_injected,
            network.stats.packets_delivered,
            network.stats.total_delivery_latency,
            network.event_log.len(),
        )
    };

    assert_eq!(run(42), run(42));
    // A different seed almost surely takes a different trajectory
    assert_ne!(run(42), run(43));
}

/// Under sustained low load, Q-Routing's greedy preferences line up with
/// the static shortest paths and mean delay approaches the shortest cost
#[test]
fn test_q_routing_converges_toward_shortest_paths() {
    init_tracing();
    let topology = TopologyBuilder::new(4).ring();
    let tables = RouteTables::compute(&topology);
    let mut network = Network::new(topology.clone(), PolicyKind::q_learned(), seeded(7));

    // Warmup: let the estimates settle
    for _ in 0..400 {
        network.inject_random_load(0.5);
        network.tick();
    }
    network.drain_delivered();
    let delivered_before = network.stats.packets_delivered;
    let latency_before = network.stats.total_delivery_latency;

    // Measurement window
    for _ in 0..400 {
        network.inject_random_load(0.5);
        network.tick();
    }
    // Flush the last in-flight packets without new load
    network.run_ticks(20);

    let delivered = network.stats.packets_delivered - delivered_before;
    let latency = network.stats.total_delivery_latency - latency_before;
    assert!(delivered > 100, "only {delivered} deliveries in window");

    // Ring of 4, unit weights: mean shortest cost is (1 + 2 + 1) / 3
    let shortest_mean = 4.0 / 3.0;
    let observed_mean = latency as f64 / delivered as f64;
    assert!(
        observed_mean < shortest_mean + 0.75,
        "mean delay {observed_mean:.2} too far above shortest {shortest_mean:.2}"
    );

    // The learned argmin neighbor should lie on a shortest path for the
    // overwhelming majority of (node, destination) pairs.
    let mut matches = 0;
    let mut total = 0;
    for id in topology.node_ids() {
        let node = network.node(id).unwrap();
        for dst in topology.node_ids() {
            if dst == id {
                continue;
            }
            let learned = topology
                .neighbors(id)
                .into_iter()
                .min_by(|a, b| {
                    let qa = node.q_value(dst, *a).unwrap_or(f64::INFINITY);
                    let qb = node.q_value(dst, *b).unwrap_or(f64::INFINITY);
                    qa.total_cmp(&qb)
                })
                .unwrap();

            let static_cost = tables.lookup(id, dst).unwrap().cost;
            let cost_via_learned = if learned == dst {
                1.0
            } else {
                1.0 + tables.lookup(learned, dst).unwrap().cost
            };

            total += 1;
            if cost_via_learned == static_cost {
                matches += 1;
            }
        }
    }
    assert!(
        matches * 10 >= total * 8,
        "only {matches}/{total} learned next hops on shortest paths"
    );
}

/// Stochastic forwarding still delivers everything on a connected graph
#[test]
fn test_stochastic_policy_delivers() {
    init_tracing();
    let topology = TopologyBuilder::new(5).ring();
    let mut network = Network::new(topology, PolicyKind::stochastic(), seeded(21));

    for _ in 0..200 {
        network.inject_random_load(0.4);
        network.tick();
    }
    network.run_ticks(200);

    assert!(network.stats.packets_delivered > 0);
    assert_eq!(network.stats.packets_dropped, 0);
    assert_eq!(
        network.stats.packets_injected,
        network.stats.packets_delivered + network.active_packet_count() as u64
    );
}

/// Adaptive-temperature variant, with the periodic hook driven on the
/// caller's cadence (every other tick here)
#[test]
fn test_adaptive_policy_under_bursty_load() {
    init_tracing();
    let topology = TopologyBuilder::new(6).ring();
    let mut network = Network::new(topology, PolicyKind::adaptive(), seeded(99));

    for tick in 0..300 {
        // Bursty offered load: heavy for 50 ticks, then quiet
        let load = if (tick / 50) % 2 == 0 { 2.0 } else { 0.1 };
        network.inject_random_load(load);
        network.tick();
        if tick % 2 == 0 {
            network.policy_tick_update();
        }
    }
    network.run_ticks(300);

    assert!(network.stats.packets_delivered > 200);
    assert_eq!(network.stats.packets_dropped, 0);
    // Whatever is still queued plus deliveries accounts for everything
    assert_eq!(
        network.stats.packets_injected,
        network.stats.packets_delivered + network.active_packet_count() as u64
    );
}

/// Random baseline delivers eventually but far less efficiently than
/// static routing on the same topology and load
#[test]
fn test_random_baseline_is_worse_than_static() {
    init_tracing();
    let run = |kind: PolicyKind| {
        let topology = TopologyBuilder::new(6).ring();
        let mut network = Network::new(topology, kind, seeded(5));
        for _ in 0..200 {
            network.inject_random_load(0.5);
            network.tick();
        }
        network.run_ticks(400);
        network.stats.mean_delivery_latency().unwrap()
    };

    let static_latency = run(PolicyKind::Static);
    let random_latency = run(PolicyKind::Random);
    assert!(
        random_latency > static_latency,
        "random {random_latency:.2} should exceed static {static_latency:.2}"
    );
}
