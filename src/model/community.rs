//! Seeded EV-adoption sampling for a community of homes.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;

use super::home::{EvSpec, Home};

/// Samples the EV-owning subset of a community without replacement.
///
/// `adoption_pct` is the fraction of homes assumed to own an EV, in percent;
/// the sampled count is `floor(adoption_pct / 100 * len)`, clamped to the
/// community size. The returned identifiers are sorted for determinism.
pub fn sample_ev_homes(home_ids: &[String], adoption_pct: f32, seed: u64) -> Vec<String> {
    let count = ((adoption_pct / 100.0) * home_ids.len() as f32).floor() as usize;
    let count = count.min(home_ids.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked: Vec<String> = sample(&mut rng, home_ids.len(), count)
        .into_iter()
        .map(|i| home_ids[i].clone())
        .collect();
    picked.sort();
    picked
}

/// Attaches the shared EV parameters to every sampled home.
pub fn equip_with_ev(homes: &mut [Home], ev_ids: &[String], spec: &EvSpec) {
    let adopters: HashSet<&str> = ev_ids.iter().map(String::as_str).collect();
    for home in homes {
        if adopters.contains(home.id.as_str()) {
            home.ev = Some(spec.clone());
        }
    }
}
