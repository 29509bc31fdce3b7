//! Synthetic scenario construction from configuration.
//!
//! Stands in for the external data loaders: builds a line feeder, a
//! community of homes with seeded sinusoid-plus-noise baselines, and the
//! sampled EV-owning subset. Deterministic for a fixed seed.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ScenarioConfig;
use crate::model::community::{equip_with_ev, sample_ev_homes};
use crate::model::{Edge, EvSpec, Home, Network, Tariff};
use crate::solve::SolveError;

/// Seed offset for the adoption sample, decorrelating it from baseline noise.
const ADOPTION_SEED_OFFSET: u64 = 57;

/// Gaussian noise via Box-Muller.
fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}

/// One home's baseline series: sinusoidal daily pattern with seeded noise,
/// clamped non-negative.
fn baseline_profile(
    base_kw: f32,
    amp_kw: f32,
    phase_rad: f32,
    noise_std: f32,
    horizon: usize,
    seed: u64,
) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..horizon)
        .map(|t| {
            let day_pos = t as f32 / horizon as f32;
            let angle = 2.0 * std::f32::consts::PI * day_pos + phase_rad;
            (base_kw + amp_kw * angle.sin() + gaussian_noise(&mut rng, noise_std)).max(0.0)
        })
        .collect()
}

/// Builds the tariff, community, and feeder a run operates on.
///
/// The feeder is a line: substation at node 0, service nodes 1..=N, with
/// `homes_per_node` homes on each service node.
///
/// # Errors
///
/// [`SolveError::InvalidInput`] when the tariff length does not match the
/// horizon; [`SolveError::Network`] if topology assembly fails.
pub fn build_scenario(config: &ScenarioConfig) -> Result<(Tariff, Vec<Home>, Network), SolveError> {
    let horizon = config.scenario.horizon_hours;
    if config.tariff.prices.len() != horizon {
        return Err(SolveError::InvalidInput(format!(
            "tariff has {} entries for a {horizon}-hour horizon",
            config.tariff.prices.len()
        )));
    }
    let tariff = Tariff::with_shift(config.tariff.prices.clone(), config.tariff.shift_hours);

    let bl = &config.baseload;
    let mut homes = Vec::new();
    let mut home_nodes = HashMap::new();
    let mut index = 0_usize;
    for node in 1..=config.network.feeder_nodes {
        for _ in 0..config.community.homes_per_node {
            index += 1;
            let id = format!("H{index:02}");
            let baseline = baseline_profile(
                bl.base_kw,
                bl.amp_kw,
                bl.phase_rad,
                bl.noise_std,
                horizon,
                config.scenario.seed.wrapping_add(index as u64),
            );
            home_nodes.insert(id.clone(), node);
            homes.push(Home::new(id, baseline));
        }
    }

    let home_ids: Vec<String> = homes.iter().map(|h| h.id.clone()).collect();
    let ev_ids = sample_ev_homes(
        &home_ids,
        config.community.adoption_pct,
        config.scenario.seed.wrapping_add(ADOPTION_SEED_OFFSET),
    );
    let e = &config.ev;
    equip_with_ev(
        &mut homes,
        &ev_ids,
        &EvSpec {
            rating_kw: e.rating_kw,
            capacity_kwh: e.capacity_kwh,
            initial_soc: e.initial_soc,
            window_start: e.window_start,
            window_end: e.window_end,
        },
    );

    let edges: Vec<Edge> = (1..=config.network.feeder_nodes)
        .map(|node| Edge {
            from: node - 1,
            to: node,
            resistance: config.network.resistance_pu_per_kw,
        })
        .collect();
    let network = Network::new(
        config.network.feeder_nodes + 1,
        0,
        &edges,
        home_nodes,
    )?;

    Ok((tariff, homes, network))
}
