//! Solution strategies over the shared data model.

/// Joint solve against hard voltage bounds.
pub mod centralized;
/// The distributed price-coordination loop.
pub mod coordinator;
pub mod error;
/// Per-home tariff-only optimization.
pub mod individual;
/// Built-in merit-order subproblem solver.
pub mod merit;
/// Mutable coordination state: dual prices, residuals, iteration count.
pub mod state;
pub mod subproblem;

pub use centralized::run_centralized;
pub use coordinator::{CoordinationConfig, Coordinator, DistributedResult};
pub use error::SolveError;
pub use individual::run_individual;
pub use merit::MeritOrderSolver;
pub use subproblem::{HomeFailure, HomeSolution, ScheduleSet, SubproblemSolver, VoltageBounds};

use crate::model::{Home, Network, Tariff};

/// Validates tariff/home/network inputs before any solver invocation.
///
/// # Errors
///
/// [`SolveError::InvalidInput`] for an empty horizon, a baseline series of
/// the wrong length, a duplicate home id, a non-positive rating or capacity,
/// an initial SOC outside [0, 1], a charging window outside the horizon, or
/// a home missing from the network's placement map.
pub fn validate_inputs(
    tariff: &Tariff,
    homes: &[Home],
    network: Option<&Network>,
) -> Result<(), SolveError> {
    let horizon = tariff.horizon();
    if horizon == 0 {
        return Err(SolveError::InvalidInput(
            "tariff horizon is empty".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::with_capacity(homes.len());
    for home in homes {
        if !seen.insert(home.id.as_str()) {
            return Err(SolveError::InvalidInput(format!(
                "duplicate home id {}",
                home.id
            )));
        }
        if home.horizon() != horizon {
            return Err(SolveError::InvalidInput(format!(
                "home {}: baseline has {} hours, tariff has {horizon}",
                home.id,
                home.horizon()
            )));
        }
        if let Some(ev) = &home.ev {
            if !(ev.rating_kw > 0.0) || !ev.rating_kw.is_finite() {
                return Err(SolveError::InvalidInput(format!(
                    "home {}: EV rating must be positive, got {}",
                    home.id, ev.rating_kw
                )));
            }
            if !(ev.capacity_kwh > 0.0) || !ev.capacity_kwh.is_finite() {
                return Err(SolveError::InvalidInput(format!(
                    "home {}: EV capacity must be positive, got {}",
                    home.id, ev.capacity_kwh
                )));
            }
            if !(0.0..=1.0).contains(&ev.initial_soc) {
                return Err(SolveError::InvalidInput(format!(
                    "home {}: initial SOC {} outside [0, 1]",
                    home.id, ev.initial_soc
                )));
            }
            if ev.window_start >= ev.window_end || ev.window_end > horizon {
                return Err(SolveError::InvalidInput(format!(
                    "home {}: charging window [{}, {}) outside horizon {horizon}",
                    home.id, ev.window_start, ev.window_end
                )));
            }
        }
        if let Some(net) = network {
            if net.node_of(&home.id).is_none() {
                return Err(SolveError::InvalidInput(format!(
                    "home {} has no feeder node assignment",
                    home.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvSpec;

    fn ev() -> EvSpec {
        EvSpec {
            rating_kw: 4.8,
            capacity_kwh: 20.0,
            initial_soc: 0.2,
            window_start: 11,
            window_end: 23,
        }
    }

    #[test]
    fn accepts_well_formed_inputs() {
        let tariff = Tariff::new(vec![0.1; 24]);
        let homes = vec![Home::with_ev("H01", vec![0.5; 24], ev())];
        assert!(validate_inputs(&tariff, &homes, None).is_ok());
    }

    #[test]
    fn rejects_window_past_horizon() {
        let tariff = Tariff::new(vec![0.1; 12]);
        let homes = vec![Home::with_ev("H01", vec![0.5; 12], ev())];
        let err = validate_inputs(&tariff, &homes, None).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInput(_)));
    }

    #[test]
    fn rejects_negative_rating() {
        let tariff = Tariff::new(vec![0.1; 24]);
        let mut spec = ev();
        spec.rating_kw = -1.0;
        let homes = vec![Home::with_ev("H01", vec![0.5; 24], spec)];
        assert!(validate_inputs(&tariff, &homes, None).is_err());
    }

    #[test]
    fn rejects_baseline_length_mismatch() {
        let tariff = Tariff::new(vec![0.1; 24]);
        let homes = vec![Home::new("H01", vec![0.5; 23])];
        assert!(validate_inputs(&tariff, &homes, None).is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let tariff = Tariff::new(vec![0.1; 24]);
        let homes = vec![
            Home::new("H01", vec![0.5; 24]),
            Home::new("H01", vec![0.6; 24]),
        ];
        assert!(validate_inputs(&tariff, &homes, None).is_err());
    }

    #[test]
    fn rejects_empty_horizon() {
        let tariff = Tariff::new(Vec::new());
        assert!(validate_inputs(&tariff, &[], None).is_err());
    }
}
