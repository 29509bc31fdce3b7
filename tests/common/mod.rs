//! Shared test fixtures for integration tests.

use std::collections::HashMap;

use ev_sched::model::{Edge, EvSpec, Home, Network, Tariff};
use ev_sched::solve::CoordinationConfig;

/// Flat tariff at the given price over the horizon.
#[allow(dead_code)]
pub fn flat_tariff(horizon: usize, price: f32) -> Tariff {
    Tariff::new(vec![price; horizon])
}

/// Two cheap night hours, two shoulder hours, four peak hours.
#[allow(dead_code)]
pub fn stepped_tariff() -> Tariff {
    Tariff::new(vec![0.05, 0.05, 0.10, 0.10, 0.20, 0.20, 0.20, 0.20])
}

/// EV spec with zero initial SOC.
#[allow(dead_code)]
pub fn ev_spec(rating_kw: f32, capacity_kwh: f32, start: usize, end: usize) -> EvSpec {
    EvSpec {
        rating_kw,
        capacity_kwh,
        initial_soc: 0.0,
        window_start: start,
        window_end: end,
    }
}

/// Substation plus one service node carrying every listed home.
#[allow(dead_code)]
pub fn shared_node_network(home_ids: &[&str], resistance: f32) -> Network {
    let edges = [Edge {
        from: 0,
        to: 1,
        resistance,
    }];
    let homes: HashMap<String, usize> =
        home_ids.iter().map(|id| (id.to_string(), 1)).collect();
    Network::new(2, 0, &edges, homes).expect("fixture network should assemble")
}

/// Line feeder 0 - 1 - 2 with one home on each service node.
#[allow(dead_code)]
pub fn line_network(first: &str, second: &str, resistance: f32) -> Network {
    let edges = [
        Edge {
            from: 0,
            to: 1,
            resistance,
        },
        Edge {
            from: 1,
            to: 2,
            resistance,
        },
    ];
    let homes = HashMap::from([(first.to_string(), 1), (second.to_string(), 2)]);
    Network::new(3, 0, &edges, homes).expect("fixture network should assemble")
}

/// Coordination config for the contested shared-node fixture: band tight
/// enough that simultaneous charging on top of the morning baseline violates,
/// with a step size large enough to force a price response immediately.
#[allow(dead_code)]
pub fn tight_coordination(iter_max: usize) -> CoordinationConfig {
    CoordinationConfig {
        kappa: 5.0,
        iter_max,
        tolerance: 1e-3,
        vset: 1.03,
        vlow: 1.005,
        vhigh: 1.05,
        price_decay: 0.5,
    }
}

/// Two homes sharing one node, both with morning baseline and an EV that
/// needs two rated hours inside a full-horizon window.
#[allow(dead_code)]
pub fn contested_homes() -> Vec<Home> {
    let baseline = vec![2.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    vec![
        Home::with_ev("A", baseline.clone(), ev_spec(2.0, 4.0, 0, 8)),
        Home::with_ev("B", baseline, ev_spec(2.0, 4.0, 0, 8)),
    ]
}
