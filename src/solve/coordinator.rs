//! Distributed price coordination between home subproblems and the feeder.
//!
//! Each round maps the subproblem solver over all homes in parallel (the
//! solves are independent given a fixed price signal), waits for the full
//! round to finish, aggregates node loads into a voltage estimate, and moves
//! the dual prices against the observed violations. Iterations are strictly
//! sequential: the next round's prices depend on this round's schedules.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::model::{Home, Network, Tariff};
use crate::report::aggregate_node_load;

use super::error::SolveError;
use super::state::{CoordinationState, PriceSignal};
use super::subproblem::{HomeFailure, HomeSolution, ScheduleSet, SubproblemSolver};
use super::validate_inputs;

/// Tuning of the distributed coordination loop.
///
/// The `[vlow, vhigh]` band is intentionally looser than the hard bounds a
/// centralized solve would enforce; the slack gives the dual updates headroom
/// while iterating.
#[derive(Debug, Clone, Copy)]
pub struct CoordinationConfig {
    /// Dual step size: price change per pu of voltage violation.
    pub kappa: f32,
    /// Hard iteration cap; the sole cancellation mechanism.
    pub iter_max: usize,
    /// Residual below which the loop stops early.
    pub tolerance: f32,
    /// Substation (target) voltage in pu.
    pub vset: f32,
    /// Lower edge of the feasible band in pu.
    pub vlow: f32,
    /// Upper edge of the feasible band in pu.
    pub vhigh: f32,
    /// Per-iteration decay factor applied to in-band prices, in [0, 1).
    pub price_decay: f32,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            kappa: 5.0,
            iter_max: 15,
            tolerance: 1e-3,
            vset: 1.03,
            vlow: 0.95,
            vhigh: 1.05,
            price_decay: 0.5,
        }
    }
}

impl CoordinationConfig {
    /// Rejects configurations no run should start with.
    ///
    /// # Errors
    ///
    /// [`SolveError::InvalidInput`] for a non-positive `kappa`, an inverted
    /// band, a target voltage outside the band, a negative tolerance, or a
    /// decay factor outside [0, 1).
    pub fn validate(&self) -> Result<(), SolveError> {
        if !(self.kappa > 0.0) || !self.kappa.is_finite() {
            return Err(SolveError::InvalidInput(format!(
                "kappa must be positive, got {}",
                self.kappa
            )));
        }
        if !(self.vlow < self.vhigh) {
            return Err(SolveError::InvalidInput(format!(
                "voltage band inverted: vlow {} >= vhigh {}",
                self.vlow, self.vhigh
            )));
        }
        if self.vset < self.vlow || self.vset > self.vhigh {
            return Err(SolveError::InvalidInput(format!(
                "vset {} outside [{}, {}]",
                self.vset, self.vlow, self.vhigh
            )));
        }
        if !(self.tolerance >= 0.0) {
            return Err(SolveError::InvalidInput(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if !(0.0..1.0).contains(&self.price_decay) {
            return Err(SolveError::InvalidInput(format!(
                "price_decay must be in [0, 1), got {}",
                self.price_decay
            )));
        }
        Ok(())
    }
}

/// Outcome of a distributed solve.
///
/// Reaching `iter_max` without convergence is not an error: the last iterate
/// is returned as a best-effort schedule and `converged` is false. Callers
/// must inspect `residual` and `iterations` to tell the cases apart.
#[derive(Debug)]
pub struct DistributedResult {
    pub set: ScheduleSet,
    /// Residual of the last completed iteration; 0.0 when `iter_max` is 0.
    pub residual: f32,
    /// Number of completed price-update iterations.
    pub iterations: usize,
    /// Whether the residual fell below the tolerance.
    pub converged: bool,
    /// Residual of every completed iteration, in order.
    pub residual_history: Vec<f32>,
}

/// Drives the price-coordination loop over a pluggable subproblem solver.
pub struct Coordinator<'a, S: SubproblemSolver> {
    solver: &'a S,
    config: CoordinationConfig,
}

impl<'a, S: SubproblemSolver> Coordinator<'a, S> {
    pub fn new(solver: &'a S, config: CoordinationConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Runs the coordination loop to convergence or the iteration cap.
    ///
    /// # Errors
    ///
    /// [`SolveError::InvalidInput`] for malformed inputs or configuration,
    /// [`SolveError::AllHomesFailed`] when no EV home has a feasible
    /// subproblem. Individual infeasible homes are reported in the result's
    /// failure list; their baseline load still counts toward the voltage
    /// estimate.
    pub fn run(
        &self,
        tariff: &Tariff,
        homes: &[Home],
        network: &Network,
    ) -> Result<DistributedResult, SolveError> {
        self.config.validate()?;
        validate_inputs(tariff, homes, Some(network))?;

        let horizon = tariff.horizon();
        let mut state = CoordinationState::new(network.node_count(), horizon);
        let mut schedules = BTreeMap::new();
        let mut failures = Vec::new();
        let mut failed: HashSet<String> = HashSet::new();

        // Round 0: neutral prices. With the built-in solver, infeasibility is
        // price-independent, so a home failing here stays excluded for good.
        self.solve_round(
            tariff,
            homes,
            network,
            &state.prices,
            &mut failed,
            &mut schedules,
            &mut failures,
        );
        let ev_homes = homes.iter().filter(|h| h.ev.is_some()).count();
        if ev_homes > 0 && failures.len() == ev_homes {
            return Err(SolveError::AllHomesFailed(ev_homes));
        }

        let mut converged = false;
        for iteration in 1..=self.config.iter_max {
            let node_load = aggregate_node_load(network, &schedules, horizon);
            let voltages = network.voltage_series(&node_load, self.config.vset);
            let residual = state.apply_voltage_feedback(&voltages, &self.config);
            debug!(iteration, residual, "price update");

            if residual <= self.config.tolerance {
                converged = true;
                break;
            }
            self.solve_round(
                tariff,
                homes,
                network,
                &state.prices,
                &mut failed,
                &mut schedules,
                &mut failures,
            );
        }

        if converged {
            info!(
                iterations = state.iteration,
                residual = state.residual,
                "distributed solve converged"
            );
        } else if self.config.iter_max > 0 {
            warn!(
                iterations = state.iteration,
                residual = state.residual,
                "iteration cap reached without convergence; returning last iterate"
            );
        }

        Ok(DistributedResult {
            set: ScheduleSet {
                schedules,
                failures,
            },
            residual: state.residual,
            iterations: state.iteration,
            converged,
            residual_history: state.residual_history,
        })
    }

    /// One parallel map over the homes, then the collection barrier.
    ///
    /// Homes in `failed` keep their existing baseline-only entry. A home
    /// failing in this round is downgraded to baseline-only, recorded once in
    /// `failures`, and added to `failed`.
    #[expect(clippy::too_many_arguments)]
    fn solve_round(
        &self,
        tariff: &Tariff,
        homes: &[Home],
        network: &Network,
        prices: &PriceSignal,
        failed: &mut HashSet<String>,
        schedules: &mut BTreeMap<String, HomeSolution>,
        failures: &mut Vec<HomeFailure>,
    ) {
        let results: Vec<(&Home, Result<HomeSolution, SolveError>)> = homes
            .par_iter()
            .filter(|home| !failed.contains(&home.id))
            .map(|home| {
                let result = match network.node_of(&home.id) {
                    Some(node) => self.solver.solve_home(tariff, home, prices.node(node)),
                    None => Err(SolveError::InvalidInput(format!(
                        "home {} has no feeder node assignment",
                        home.id
                    ))),
                };
                (home, result)
            })
            .collect();

        for (home, result) in results {
            match result {
                Ok(solution) => {
                    schedules.insert(home.id.clone(), solution);
                }
                Err(error) => {
                    schedules
                        .insert(home.id.clone(), HomeSolution::baseline_only(home));
                    failures.push(HomeFailure {
                        home: home.id.clone(),
                        error,
                    });
                    failed.insert(home.id.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CoordinationConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_band_is_rejected() {
        let config = CoordinationConfig {
            vlow: 1.05,
            vhigh: 0.95,
            vset: 1.0,
            ..CoordinationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SolveError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_kappa_is_rejected() {
        let config = CoordinationConfig {
            kappa: 0.0,
            ..CoordinationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unit_decay_is_rejected() {
        let config = CoordinationConfig {
            price_decay: 1.0,
            ..CoordinationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn vset_outside_band_is_rejected() {
        let config = CoordinationConfig {
            vset: 1.06,
            ..CoordinationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
