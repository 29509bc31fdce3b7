//! Subproblem solver contract and solution records.
//!
//! The numerical program behind each solve is a pluggable collaborator: the
//! coordination loop and the single-shot strategies only see this trait, so
//! any minimizer producing the same solution shape is interchangeable.

use std::collections::BTreeMap;

use crate::model::{Home, Network, Tariff};

use super::error::SolveError;

/// Solved schedule triple for one home.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeSolution {
    /// EV charging power per hour (kW, zero outside the charging window).
    pub charging_kw: Vec<f32>,
    /// State of charge after each hour; `soc[0]` is the plug-in value, so the
    /// vector is one longer than the horizon. All zeros for homes without an EV.
    pub soc: Vec<f32>,
    /// Non-EV household load per hour (kW).
    pub residual_kw: Vec<f32>,
}

impl HomeSolution {
    /// Solution for a home that schedules no charging.
    pub fn baseline_only(home: &Home) -> Self {
        let horizon = home.horizon();
        let initial = home.ev.as_ref().map_or(0.0, |ev| ev.initial_soc);
        Self {
            charging_kw: vec![0.0; horizon],
            soc: vec![initial; horizon + 1],
            residual_kw: home.baseline_kw.clone(),
        }
    }

    /// Total energy the schedule delivers to the battery (kWh).
    pub fn charged_energy_kwh(&self) -> f32 {
        self.charging_kw.iter().sum()
    }

    /// Combined household draw in the given hour (kW).
    pub fn total_kw(&self, hour: usize) -> f32 {
        self.residual_kw[hour] + self.charging_kw[hour]
    }
}

/// A home whose subproblem failed, with the reason.
#[derive(Debug)]
pub struct HomeFailure {
    pub home: String,
    pub error: SolveError,
}

/// Per-home schedules keyed by home id, plus the homes that failed.
///
/// Per-home failures do not abort a run: successful homes are returned here
/// and the failures reported alongside.
#[derive(Debug, Default)]
pub struct ScheduleSet {
    pub schedules: BTreeMap<String, HomeSolution>,
    pub failures: Vec<HomeFailure>,
}

impl ScheduleSet {
    /// Total EV energy across all scheduled homes (kWh).
    pub fn total_charged_kwh(&self) -> f32 {
        self.schedules.values().map(HomeSolution::charged_energy_kwh).sum()
    }
}

/// Voltage envelope for the centralized joint solve.
#[derive(Debug, Clone, Copy)]
pub struct VoltageBounds {
    /// Substation (target) voltage in pu.
    pub vset: f32,
    /// Hard lower bound in pu.
    pub vmin: f32,
    /// Hard upper bound in pu.
    pub vmax: f32,
}

impl VoltageBounds {
    /// Rejects inverted or unattainable bounds.
    pub fn validate(&self) -> Result<(), SolveError> {
        if !(self.vmin < self.vmax) {
            return Err(SolveError::InvalidInput(format!(
                "voltage bounds inverted: vmin {} >= vmax {}",
                self.vmin, self.vmax
            )));
        }
        if self.vset < self.vmin || self.vset > self.vmax {
            return Err(SolveError::InvalidInput(format!(
                "vset {} outside [{}, {}]",
                self.vset, self.vmin, self.vmax
            )));
        }
        Ok(())
    }
}

/// Black-box minimizer for the per-home and whole-network programs.
///
/// Implementations must be pure per call: no state may leak between
/// invocations, and concurrent `solve_home` calls must be safe (the
/// coordinator fans them out across a thread pool).
pub trait SubproblemSolver: Sync {
    /// Schedules one home against the tariff plus a per-hour price signal.
    ///
    /// `price_signal` is the dual price of the home's feeder node, added to
    /// the tariff hour by hour; an empty slice means a neutral signal.
    ///
    /// # Errors
    ///
    /// [`SolveError::Infeasible`] when the charging window cannot deliver the
    /// required energy at the rated power.
    fn solve_home(
        &self,
        tariff: &Tariff,
        home: &Home,
        price_signal: &[f32],
    ) -> Result<HomeSolution, SolveError>;

    /// Schedules all homes jointly against explicit voltage bounds.
    ///
    /// # Errors
    ///
    /// A global error only when no schedule exists at all (malformed inputs
    /// or baseline-infeasible network); per-home infeasibilities are reported
    /// in the returned [`ScheduleSet::failures`].
    fn solve_network(
        &self,
        tariff: &Tariff,
        homes: &[Home],
        network: &Network,
        bounds: &VoltageBounds,
    ) -> Result<ScheduleSet, SolveError>;
}
