//! Built-in merit-order subproblem solver.
//!
//! The per-home program has a linear objective, box constraints, and a single
//! energy-balance equality, so filling the cheapest effective-price hours at
//! the rated power (fractional at the margin) is exactly optimal. The joint
//! variant fills homes in id order against the remaining per-(node, hour)
//! voltage headroom derived from the feeder sensitivity matrix.

use std::cmp::Ordering;

use crate::model::{EvSpec, Home, Network, Tariff};

use super::error::SolveError;
use super::subproblem::{
    HomeFailure, HomeSolution, ScheduleSet, SubproblemSolver, VoltageBounds,
};

/// Energy slack below which a requirement counts as met (kWh).
const ENERGY_EPS: f32 = 1e-4;

/// Power below which an allocation is not worth committing (kW).
const POWER_EPS: f32 = 1e-6;

/// Exact merit-order minimizer for the charging subproblems.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeritOrderSolver;

fn effective_price(tariff: &Tariff, price_signal: &[f32], hour: usize) -> f32 {
    tariff.price(hour) + price_signal.get(hour).copied().unwrap_or(0.0)
}

/// Window hours sorted by price, index order breaking ties for determinism.
fn merit_order(ev: &EvSpec, price_of: impl Fn(usize) -> f32) -> Vec<usize> {
    let mut hours: Vec<usize> = (ev.window_start..ev.window_end).collect();
    hours.sort_by(|&a, &b| {
        price_of(a)
            .partial_cmp(&price_of(b))
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    hours
}

fn window_infeasible(home: &Home, ev: &EvSpec) -> SolveError {
    SolveError::Infeasible {
        home: home.id.clone(),
        reason: format!(
            "window [{}, {}) delivers at most {:.2} kWh at {:.2} kW, {:.2} kWh required",
            ev.window_start,
            ev.window_end,
            ev.deliverable_energy_kwh(),
            ev.rating_kw,
            ev.required_energy_kwh()
        ),
    }
}

/// Builds the solution triple from a committed charging series.
fn solution_from_charging(home: &Home, ev: &EvSpec, charging_kw: Vec<f32>) -> HomeSolution {
    let mut soc = Vec::with_capacity(charging_kw.len() + 1);
    let mut s = ev.initial_soc;
    soc.push(s);
    for &p in &charging_kw {
        s = (s + p / ev.capacity_kwh).min(1.0);
        soc.push(s);
    }
    HomeSolution {
        charging_kw,
        soc,
        residual_kw: home.baseline_kw.clone(),
    }
}

fn fill_home(
    tariff: &Tariff,
    home: &Home,
    ev: &EvSpec,
    price_signal: &[f32],
) -> Result<HomeSolution, SolveError> {
    let needed = ev.required_energy_kwh();
    if needed > ev.deliverable_energy_kwh() + ENERGY_EPS {
        return Err(window_infeasible(home, ev));
    }

    let mut charging = vec![0.0_f32; home.horizon()];
    let mut remaining = needed;
    for t in merit_order(ev, |h| effective_price(tariff, price_signal, h)) {
        if remaining <= ENERGY_EPS {
            break;
        }
        let p = ev.rating_kw.min(remaining);
        charging[t] = p;
        remaining -= p;
    }
    Ok(solution_from_charging(home, ev, charging))
}

/// Fills one home while honoring the remaining voltage headroom, mutating
/// the running voltage estimate on commit. Rolls back on failure.
fn fill_against_headroom(
    tariff: &Tariff,
    home: &Home,
    ev: &EvSpec,
    node: usize,
    sensitivity: &[Vec<f32>],
    voltage: &mut [Vec<f32>],
    bounds: &VoltageBounds,
) -> Result<HomeSolution, SolveError> {
    let needed = ev.required_energy_kwh();
    if needed > ev.deliverable_energy_kwh() + ENERGY_EPS {
        return Err(window_infeasible(home, ev));
    }

    let mut charging = vec![0.0_f32; home.horizon()];
    let mut remaining = needed;
    for t in merit_order(ev, |h| tariff.price(h)) {
        if remaining <= ENERGY_EPS {
            break;
        }
        let mut commit = ev.rating_kw.min(remaining);
        for (m, row) in sensitivity.iter().enumerate() {
            let s = row[node];
            if s > 0.0 {
                commit = commit.min((voltage[m][t] - bounds.vmin) / s);
            }
        }
        if commit <= POWER_EPS {
            continue;
        }
        charging[t] = commit;
        for (m, row) in sensitivity.iter().enumerate() {
            let s = row[node];
            if s > 0.0 {
                voltage[m][t] -= s * commit;
            }
        }
        remaining -= commit;
    }

    if remaining > ENERGY_EPS {
        for (t, &p) in charging.iter().enumerate() {
            if p > 0.0 {
                for (m, row) in sensitivity.iter().enumerate() {
                    let s = row[node];
                    if s > 0.0 {
                        voltage[m][t] += s * p;
                    }
                }
            }
        }
        return Err(SolveError::Infeasible {
            home: home.id.clone(),
            reason: format!(
                "{remaining:.2} of {needed:.2} kWh unplaceable without \
                 breaching the {:.3} pu floor",
                bounds.vmin
            ),
        });
    }
    Ok(solution_from_charging(home, ev, charging))
}

impl SubproblemSolver for MeritOrderSolver {
    fn solve_home(
        &self,
        tariff: &Tariff,
        home: &Home,
        price_signal: &[f32],
    ) -> Result<HomeSolution, SolveError> {
        match &home.ev {
            None => Ok(HomeSolution::baseline_only(home)),
            Some(ev) => fill_home(tariff, home, ev, price_signal),
        }
    }

    fn solve_network(
        &self,
        tariff: &Tariff,
        homes: &[Home],
        network: &Network,
        bounds: &VoltageBounds,
    ) -> Result<ScheduleSet, SolveError> {
        bounds.validate()?;
        let horizon = tariff.horizon();

        // Baseline node loads and the voltage profile they imply.
        let mut node_kw = vec![vec![0.0_f32; horizon]; network.node_count()];
        for home in homes {
            let Some(node) = network.node_of(&home.id) else {
                return Err(SolveError::InvalidInput(format!(
                    "home {} has no feeder node assignment",
                    home.id
                )));
            };
            for (t, &kw) in home.baseline_kw.iter().enumerate() {
                node_kw[node][t] += kw;
            }
        }
        let mut voltage = network.voltage_series(&node_kw, bounds.vset);
        for (node, row) in voltage.iter().enumerate() {
            for (hour, &v) in row.iter().enumerate() {
                if v < bounds.vmin || v > bounds.vmax {
                    return Err(SolveError::NetworkInfeasible {
                        node,
                        hour,
                        voltage: v,
                        vmin: bounds.vmin,
                        vmax: bounds.vmax,
                    });
                }
            }
        }

        let sensitivity = network.sensitivity();
        let mut ordered: Vec<&Home> = homes.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let mut set = ScheduleSet::default();
        for home in ordered {
            let Some(ev) = &home.ev else {
                set.schedules
                    .insert(home.id.clone(), HomeSolution::baseline_only(home));
                continue;
            };
            let Some(node) = network.node_of(&home.id) else {
                continue; // unreachable: checked above
            };
            match fill_against_headroom(
                tariff,
                home,
                ev,
                node,
                &sensitivity,
                &mut voltage,
                bounds,
            ) {
                Ok(sol) => {
                    set.schedules.insert(home.id.clone(), sol);
                }
                Err(error) => {
                    set.schedules
                        .insert(home.id.clone(), HomeSolution::baseline_only(home));
                    set.failures.push(HomeFailure {
                        home: home.id.clone(),
                        error,
                    });
                }
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::model::Edge;

    fn ev(rating_kw: f32, capacity_kwh: f32, start: usize, end: usize) -> EvSpec {
        EvSpec {
            rating_kw,
            capacity_kwh,
            initial_soc: 0.0,
            window_start: start,
            window_end: end,
        }
    }

    #[test]
    fn charges_cheapest_hours_first() {
        let tariff = Tariff::new(vec![0.30, 0.10, 0.20, 0.05]);
        let home = Home::with_ev("H01", vec![0.0; 4], ev(2.0, 4.0, 0, 4));
        let sol = MeritOrderSolver.solve_home(&tariff, &home, &[]).unwrap();
        // 4 kWh at 2 kW: the two cheapest hours (3 then 1) at rating.
        assert_eq!(sol.charging_kw, vec![0.0, 2.0, 0.0, 2.0]);
    }

    #[test]
    fn price_signal_repels_charging() {
        let tariff = Tariff::new(vec![0.10, 0.10, 0.20, 0.20]);
        let home = Home::with_ev("H01", vec![0.0; 4], ev(2.0, 4.0, 0, 4));
        // Penalize the cheap hours hard enough to flip the order.
        let prices = [0.50, 0.50, 0.0, 0.0];
        let sol = MeritOrderSolver.solve_home(&tariff, &home, &prices).unwrap();
        assert_eq!(sol.charging_kw, vec![0.0, 0.0, 2.0, 2.0]);
    }

    #[test]
    fn marginal_hour_charges_fractionally() {
        let tariff = Tariff::new(vec![0.10, 0.20, 0.30]);
        let home = Home::with_ev("H01", vec![0.0; 3], ev(2.0, 3.0, 0, 3));
        let sol = MeritOrderSolver.solve_home(&tariff, &home, &[]).unwrap();
        assert_eq!(sol.charging_kw, vec![2.0, 1.0, 0.0]);
        assert!((sol.charged_energy_kwh() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn never_charges_outside_window() {
        let tariff = Tariff::new(vec![0.01, 0.01, 0.50, 0.50, 0.01, 0.01]);
        let home = Home::with_ev("H01", vec![0.0; 6], ev(3.0, 6.0, 2, 4));
        let sol = MeritOrderSolver.solve_home(&tariff, &home, &[]).unwrap();
        for t in [0, 1, 4, 5] {
            assert_eq!(sol.charging_kw[t], 0.0, "hour {t} is outside the window");
        }
        assert!((sol.charged_energy_kwh() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn soc_is_monotone_and_ends_full() {
        let tariff = Tariff::new(vec![0.1; 6]);
        let home = Home::with_ev("H01", vec![0.0; 6], ev(2.0, 8.0, 0, 6));
        let sol = MeritOrderSolver.solve_home(&tariff, &home, &[]).unwrap();
        for w in sol.soc.windows(2) {
            assert!(w[1] >= w[0] - 1e-6);
        }
        assert!((sol.soc.last().copied().unwrap_or(0.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn short_window_is_infeasible() {
        let tariff = Tariff::new(vec![0.1; 6]);
        let home = Home::with_ev("H01", vec![0.0; 6], ev(2.0, 10.0, 0, 2));
        let err = MeritOrderSolver.solve_home(&tariff, &home, &[]).unwrap_err();
        assert!(matches!(err, SolveError::Infeasible { .. }));
    }

    #[test]
    fn joint_solve_respects_voltage_floor() {
        // Two homes on one node; full-rate simultaneous charging would sag
        // below vmin, so the fill must spread out.
        let edges = [Edge {
            from: 0,
            to: 1,
            resistance: 0.004,
        }];
        let homes_map = HashMap::from([("A".to_string(), 1), ("B".to_string(), 1)]);
        let network = Network::new(2, 0, &edges, homes_map).unwrap();
        let tariff = Tariff::new(vec![0.05, 0.10, 0.15, 0.20]);
        let homes = vec![
            Home::with_ev("A", vec![0.0; 4], ev(3.0, 6.0, 0, 4)),
            Home::with_ev("B", vec![0.0; 4], ev(3.0, 6.0, 0, 4)),
        ];
        let bounds = VoltageBounds {
            vset: 1.03,
            vmin: 1.01,
            vmax: 1.05,
        };
        let set = MeritOrderSolver
            .solve_network(&tariff, &homes, &network, &bounds)
            .unwrap();
        assert!(set.failures.is_empty(), "both homes fit: {:?}", set.failures);

        // Re-check the committed schedules against the voltage model.
        let mut node_kw = vec![vec![0.0_f32; 4]; 2];
        for sol in set.schedules.values() {
            for t in 0..4 {
                node_kw[1][t] += sol.total_kw(t);
            }
        }
        let voltage = network.voltage_series(&node_kw, bounds.vset);
        for row in &voltage {
            for &v in row {
                assert!(v >= bounds.vmin - 1e-4, "voltage {v} below floor");
            }
        }
        assert!((set.total_charged_kwh() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn baseline_violation_fails_the_joint_solve() {
        let edges = [Edge {
            from: 0,
            to: 1,
            resistance: 0.01,
        }];
        let homes_map = HashMap::from([("A".to_string(), 1)]);
        let network = Network::new(2, 0, &edges, homes_map).unwrap();
        let tariff = Tariff::new(vec![0.1; 4]);
        // 10 kW of baseline drops node 1 to 0.93, below vmin.
        let homes = vec![Home::new("A", vec![10.0; 4])];
        let bounds = VoltageBounds {
            vset: 1.03,
            vmin: 0.95,
            vmax: 1.05,
        };
        let err = MeritOrderSolver
            .solve_network(&tariff, &homes, &network, &bounds)
            .unwrap_err();
        assert!(matches!(err, SolveError::NetworkInfeasible { .. }));
    }
}
