//! Post-hoc aggregation of per-home schedules into network-wide figures.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Network, Tariff};
use crate::solve::subproblem::{HomeSolution, ScheduleSet};

/// Sums per-home total draw (residual + charging) into a `[node][hour]`
/// load matrix. Homes without a feeder placement are skipped.
pub fn aggregate_node_load(
    network: &Network,
    schedules: &BTreeMap<String, HomeSolution>,
    horizon: usize,
) -> Vec<Vec<f32>> {
    let mut node_kw = vec![vec![0.0_f32; horizon]; network.node_count()];
    for (home_id, solution) in schedules {
        if let Some(node) = network.node_of(home_id) {
            for (t, row) in node_kw[node].iter_mut().enumerate() {
                *row += solution.total_kw(t);
            }
        }
    }
    node_kw
}

/// Aggregate figures derived from a complete schedule set.
///
/// Computed post-hoc from the returned schedules so the report always agrees
/// with the data handed to the exporter.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    /// Tariff cost of all EV charging (tariff units).
    pub charging_cost: f32,
    /// Total EV energy delivered (kWh).
    pub ev_energy_kwh: f32,
    /// Highest single-node hourly load (kW).
    pub peak_node_kw: f32,
    /// Lowest estimated node voltage (pu).
    pub min_voltage_pu: f32,
    /// Number of (node, hour) entries outside the voltage band.
    pub band_violations: usize,
    /// Homes whose subproblem failed.
    pub failed_homes: usize,
}

impl SummaryReport {
    /// Evaluates a schedule set against the feeder and a voltage band.
    pub fn from_schedules(
        tariff: &Tariff,
        network: &Network,
        set: &ScheduleSet,
        vset: f32,
        vlow: f32,
        vhigh: f32,
    ) -> Self {
        let horizon = tariff.horizon();
        let mut charging_cost = 0.0_f32;
        let mut ev_energy_kwh = 0.0_f32;
        for solution in set.schedules.values() {
            for (t, &p) in solution.charging_kw.iter().enumerate() {
                charging_cost += tariff.price(t) * p;
                ev_energy_kwh += p;
            }
        }

        let node_kw = aggregate_node_load(network, &set.schedules, horizon);
        let voltages = network.voltage_series(&node_kw, vset);

        let mut peak_node_kw = 0.0_f32;
        for row in &node_kw {
            for &kw in row {
                peak_node_kw = peak_node_kw.max(kw);
            }
        }

        let mut min_voltage_pu = vset;
        let mut band_violations = 0_usize;
        for row in &voltages {
            for &v in row {
                min_voltage_pu = min_voltage_pu.min(v);
                if v < vlow || v > vhigh {
                    band_violations += 1;
                }
            }
        }

        Self {
            charging_cost,
            ev_energy_kwh,
            peak_node_kw,
            min_voltage_pu,
            band_violations,
            failed_homes: set.failures.len(),
        }
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Schedule Summary ---")?;
        writeln!(f, "EV energy delivered:  {:.2} kWh", self.ev_energy_kwh)?;
        writeln!(f, "Charging cost:        {:.3}", self.charging_cost)?;
        writeln!(f, "Peak node load:       {:.2} kW", self.peak_node_kw)?;
        writeln!(f, "Minimum voltage:      {:.4} pu", self.min_voltage_pu)?;
        writeln!(f, "Band violations:      {}", self.band_violations)?;
        write!(f, "Failed homes:         {}", self.failed_homes)
    }
}
