/// EV charging parameters attached to an adopting home.
///
/// The charging window `[window_start, window_end)` is expressed in hours of
/// the scheduling horizon; charging power is zero outside it. The vehicle is
/// charged to full, so the energy the schedule must deliver is
/// `(1 - initial_soc) * capacity_kwh`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvSpec {
    /// Maximum charging power in kilowatts.
    pub rating_kw: f32,
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f32,
    /// State of charge at plug-in, as a fraction in [0, 1].
    pub initial_soc: f32,
    /// First hour of the charging window (inclusive).
    pub window_start: usize,
    /// Last hour of the charging window (exclusive).
    pub window_end: usize,
}

impl EvSpec {
    /// Energy the schedule must deliver to reach a full battery (kWh).
    pub fn required_energy_kwh(&self) -> f32 {
        (1.0 - self.initial_soc).max(0.0) * self.capacity_kwh
    }

    /// Number of hours in the charging window.
    pub fn window_hours(&self) -> usize {
        self.window_end.saturating_sub(self.window_start)
    }

    /// Upper bound on deliverable energy: rating sustained over the window (kWh).
    pub fn deliverable_energy_kwh(&self) -> f32 {
        self.rating_kw * self.window_hours() as f32
    }

    /// Returns `true` when `hour` lies inside the charging window.
    pub fn in_window(&self, hour: usize) -> bool {
        hour >= self.window_start && hour < self.window_end
    }
}

/// One residence: a fixed hourly baseline load and, for adopting homes, an
/// EV to schedule.
///
/// Immutable once constructed; solve results are carried separately as
/// [`HomeSolution`](crate::solve::subproblem::HomeSolution) values.
#[derive(Debug, Clone)]
pub struct Home {
    /// Unique home identifier.
    pub id: String,
    /// Non-EV household load per hour (kW, non-negative).
    pub baseline_kw: Vec<f32>,
    /// EV parameters, present only for adopting homes.
    pub ev: Option<EvSpec>,
}

impl Home {
    /// Creates a home with no EV.
    pub fn new(id: impl Into<String>, baseline_kw: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            baseline_kw,
            ev: None,
        }
    }

    /// Creates a home with an EV to schedule.
    pub fn with_ev(id: impl Into<String>, baseline_kw: Vec<f32>, ev: EvSpec) -> Self {
        Self {
            id: id.into(),
            baseline_kw,
            ev: Some(ev),
        }
    }

    /// Scheduling horizon implied by the baseline series.
    pub fn horizon(&self) -> usize {
        self.baseline_kw.len()
    }
}
