//! Single-shot joint optimization against hard voltage bounds.

use crate::model::{Home, Network, Tariff};

use super::error::SolveError;
use super::subproblem::{ScheduleSet, SubproblemSolver, VoltageBounds};
use super::validate_inputs;

/// Solves all homes jointly; returned voltages respect `[vmin, vmax]` as a
/// hard constraint, not best-effort.
///
/// # Errors
///
/// [`SolveError::InvalidInput`] for malformed inputs or bounds,
/// [`SolveError::NetworkInfeasible`] when baseline load alone violates the
/// bounds, [`SolveError::AllHomesFailed`] when every EV home is infeasible.
pub fn run_centralized<S: SubproblemSolver>(
    tariff: &Tariff,
    homes: &[Home],
    network: &Network,
    bounds: &VoltageBounds,
    solver: &S,
) -> Result<ScheduleSet, SolveError> {
    validate_inputs(tariff, homes, Some(network))?;
    bounds.validate()?;

    let set = solver.solve_network(tariff, homes, network, bounds)?;
    let ev_homes = homes.iter().filter(|h| h.ev.is_some()).count();
    if ev_homes > 0 && set.failures.len() == ev_homes {
        return Err(SolveError::AllHomesFailed(ev_homes));
    }
    Ok(set)
}
