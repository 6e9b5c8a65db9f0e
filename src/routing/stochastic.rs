//! Stochastic Q-Routing variants
//!
//! Replaces the greedy minimum with softmax sampling over the learned
//! estimates: lower cost means higher probability, with a temperature
//! parameter controlling how concentrated the distribution is. The
//! adaptive variant derives its temperature from the recent trend of the
//! local queue length, so nodes whose queues are growing explore more.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use rand::rngs::StdRng;

use crate::routing::q_learning::QTable;
use crate::routing::{EstimateSnapshot, RoutingPolicy};
use crate::types::NodeId;

/// Fixed temperature of the non-adaptive stochastic policy; low enough
/// to stay near-greedy while keeping every neighbor reachable
pub const DEFAULT_TEMPERATURE: f64 = 0.001;

/// Queue-length samples kept by the adaptive variant
pub const DEFAULT_HISTORY: usize = 32;

/// Floor keeping the softmax denominator non-degenerate
pub const MIN_TEMPERATURE: f64 = 1e-10;

/// Queue-average thresholds and multipliers of the three-bucket
/// temperature policy
const LOW_QUEUE_AVG: f64 = 0.1;
const HIGH_QUEUE_AVG: f64 = 20.0;
const LOW_MULTIPLIER: f64 = 0.1;
const HIGH_MULTIPLIER: f64 = 20.0;
const DEFAULT_MULTIPLIER: f64 = 5.0;

/// Softmax distribution over neighbor estimates, lower cost first
///
/// Estimates are shifted by their minimum before exponentiating so large
/// costs cannot overflow. Probabilities are all positive and sum to one
/// for any non-empty input and any temperature above zero.
pub fn softmax_probabilities(
    entries: &BTreeMap<NodeId, f64>,
    temperature: f64,
) -> Vec<(NodeId, f64)> {
    let min_q = entries
        .values()
        .copied()
        .fold(f64::INFINITY, f64::min);

    let weights: Vec<(NodeId, f64)> = entries
        .iter()
        .map(|(n, q)| (*n, (-(q - min_q) / temperature).exp()))
        .collect();

    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    weights.into_iter().map(|(n, w)| (n, w / total)).collect()
}

/// Sample one neighbor from a softmax distribution
fn sample(probabilities: &[(NodeId, f64)], rng: &mut StdRng) -> NodeId {
    let roll: f64 = rng.random();
    let mut cumulative = 0.0;
    for (node, p) in probabilities {
        cumulative += p;
        if roll < cumulative {
            return *node;
        }
    }
    // Floating point shortfall: the tail of the distribution
    probabilities.last().map(|(n, _)| *n).unwrap()
}

/// Ordinary least-squares slope of queue length against sample index
pub fn queue_trend_slope(history: &VecDeque<usize>) -> f64 {
    let n = history.len();
    if n < 2 {
        return 0.0;
    }

    let mean_t = (n - 1) as f64 / 2.0;
    let mean_q = history.iter().sum::<usize>() as f64 / n as f64;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (t, q) in history.iter().enumerate() {
        let dt = t as f64 - mean_t;
        numerator += dt * (*q as f64 - mean_q);
        denominator += dt * dt;
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Temperature from the recent queue history: congestion *trend* scaled
/// by a multiplier picked from the congestion *level*
pub fn adaptive_temperature(history: &VecDeque<usize>) -> f64 {
    if history.is_empty() {
        return MIN_TEMPERATURE;
    }

    let avg = history.iter().sum::<usize>() as f64 / history.len() as f64;
    let slope = queue_trend_slope(history);

    let multiplier = if avg < LOW_QUEUE_AVG {
        LOW_MULTIPLIER
    } else if avg > HIGH_QUEUE_AVG {
        HIGH_MULTIPLIER
    } else {
        DEFAULT_MULTIPLIER
    };

    (multiplier * slope.abs()).max(MIN_TEMPERATURE)
}

fn stochastic_next_hop(
    table: &mut QTable,
    dst: NodeId,
    queue_len: usize,
    temperature: f64,
    estimates: &EstimateSnapshot,
    rng: &mut StdRng,
) -> Option<NodeId> {
    let next = match table.entries(dst) {
        Some(entries) if !entries.is_empty() => {
            let probabilities = softmax_probabilities(entries, temperature);
            sample(&probabilities, rng)
        }
        // Nothing learned about this destination: uniform choice among
        // physical neighbors rather than failing
        _ => {
            let neighbors = table.neighbors();
            if neighbors.is_empty() {
                return None;
            }
            neighbors[rng.random_range(0..neighbors.len())]
        }
    };

    table.update(dst, next, queue_len, estimates);
    Some(next)
}

/// Softmax Q-Routing at a fixed temperature
#[derive(Debug)]
pub struct StochasticPolicy {
    table: QTable,
    temperature: f64,
}

impl StochasticPolicy {
    pub fn new(node: NodeId, neighbors: Vec<NodeId>, destinations: Vec<NodeId>, alpha: f64) -> Self {
        Self {
            table: QTable::new(node, neighbors, destinations, alpha),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        assert!(temperature > 0.0, "softmax temperature must be positive");
        self.temperature = temperature;
        self
    }
}

impl RoutingPolicy for StochasticPolicy {
    fn next_hop(
        &mut self,
        dst: NodeId,
        queue_len: usize,
        estimates: &EstimateSnapshot,
        rng: &mut StdRng,
    ) -> Option<NodeId> {
        stochastic_next_hop(&mut self.table, dst, queue_len, self.temperature, estimates, rng)
    }

    fn estimate(&self, dst: NodeId) -> f64 {
        self.table.best_estimate(dst)
    }

    fn q_value(&self, dst: NodeId, via: NodeId) -> Option<f64> {
        self.table.value(dst, via)
    }
}

/// Softmax Q-Routing with queue-trend-driven temperature
///
/// `tick_update` is driven by the caller on its own cadence: each call
/// appends the current queue length to a bounded history and recomputes
/// the temperature from the history's average and slope.
#[derive(Debug)]
pub struct AdaptivePolicy {
    table: QTable,
    temperature: f64,
    history: VecDeque<usize>,
    capacity: usize,
}

impl AdaptivePolicy {
    pub fn new(
        node: NodeId,
        neighbors: Vec<NodeId>,
        destinations: Vec<NodeId>,
        alpha: f64,
        capacity: usize,
    ) -> Self {
        assert!(capacity >= 2, "history must hold at least 2 samples");
        Self {
            table: QTable::new(node, neighbors, destinations, alpha),
            temperature: 1.0,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl RoutingPolicy for AdaptivePolicy {
    fn next_hop(
        &mut self,
        dst: NodeId,
        queue_len: usize,
        estimates: &EstimateSnapshot,
        rng: &mut StdRng,
    ) -> Option<NodeId> {
        stochastic_next_hop(&mut self.table, dst, queue_len, self.temperature, estimates, rng)
    }

    fn estimate(&self, dst: NodeId) -> f64 {
        self.table.best_estimate(dst)
    }

    fn q_value(&self, dst: NodeId, via: NodeId) -> Option<f64> {
        self.table.value(dst, via)
    }

    fn tick_update(&mut self, queue_len: usize) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(queue_len);
        self.temperature = adaptive_temperature(&self.history);
    }
}
