//! Per-home tariff-only optimization.
//!
//! Every home is solved once with a neutral price signal: no network
//! feedback, no iteration. Deterministic for identical inputs.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::model::{Home, Tariff};

use super::error::SolveError;
use super::subproblem::{HomeFailure, HomeSolution, ScheduleSet, SubproblemSolver};
use super::validate_inputs;

/// Solves each home independently against the tariff alone.
///
/// # Errors
///
/// [`SolveError::InvalidInput`] for malformed inputs,
/// [`SolveError::AllHomesFailed`] when every EV home is infeasible.
/// Individual infeasible homes are downgraded to their baseline and listed
/// in the returned failures.
pub fn run_individual<S: SubproblemSolver>(
    tariff: &Tariff,
    homes: &[Home],
    solver: &S,
) -> Result<ScheduleSet, SolveError> {
    validate_inputs(tariff, homes, None)?;

    let neutral = vec![0.0_f32; tariff.horizon()];
    let results: Vec<(&Home, Result<HomeSolution, SolveError>)> = homes
        .par_iter()
        .map(|home| (home, solver.solve_home(tariff, home, &neutral)))
        .collect();

    let mut schedules = BTreeMap::new();
    let mut failures = Vec::new();
    for (home, result) in results {
        match result {
            Ok(solution) => {
                schedules.insert(home.id.clone(), solution);
            }
            Err(error) => {
                schedules.insert(home.id.clone(), HomeSolution::baseline_only(home));
                failures.push(HomeFailure {
                    home: home.id.clone(),
                    error,
                });
            }
        }
    }

    let ev_homes = homes.iter().filter(|h| h.ev.is_some()).count();
    if ev_homes > 0 && failures.len() == ev_homes {
        return Err(SolveError::AllHomesFailed(ev_homes));
    }
    Ok(ScheduleSet {
        schedules,
        failures,
    })
}
