//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Horizon, seed, and strategy selection.
    #[serde(default)]
    pub scenario: ScenarioParams,
    /// Electricity tariff.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Baseline household load shape.
    #[serde(default)]
    pub baseload: BaseloadConfig,
    /// Community size and EV adoption.
    #[serde(default)]
    pub community: CommunityConfig,
    /// Shared EV charging parameters.
    #[serde(default)]
    pub ev: EvConfig,
    /// Feeder topology parameters.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Distributed coordination tuning.
    #[serde(default)]
    pub distributed: DistributedConfig,
    /// Centralized solve voltage bounds.
    #[serde(default)]
    pub centralized: CentralizedConfig,
}

/// Horizon, seed, and strategy selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioParams {
    /// Scheduling horizon in hours (must be > 0).
    pub horizon_hours: usize,
    /// Master random seed (adoption sampling and baseline noise).
    pub seed: u64,
    /// Strategy: `"individual"`, `"centralized"`, or `"distributed"`.
    pub strategy: String,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            horizon_hours: 24,
            seed: 1234,
            strategy: "distributed".to_string(),
        }
    }
}

/// Electricity tariff parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Midnight-aligned price per kWh, one entry per horizon hour.
    pub prices: Vec<f32>,
    /// Left rotation applied so index 0 is the first scheduling hour.
    pub shift_hours: usize,
}

impl Default for TariffConfig {
    fn default() -> Self {
        // Simple time-of-use shape: cheap nights, evening peak.
        let mut prices = Vec::with_capacity(24);
        prices.extend(std::iter::repeat_n(0.055, 6)); // 00-05
        prices.extend(std::iter::repeat_n(0.09, 6)); // 06-11
        prices.extend(std::iter::repeat_n(0.12, 5)); // 12-16
        prices.extend(std::iter::repeat_n(0.16, 5)); // 17-21
        prices.extend(std::iter::repeat_n(0.07, 2)); // 22-23
        Self {
            prices,
            shift_hours: 6,
        }
    }
}

/// Baseline household load shape (sinusoid plus seeded noise).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseloadConfig {
    /// Baseline consumption (kW).
    pub base_kw: f32,
    /// Sinusoidal amplitude (kW).
    pub amp_kw: f32,
    /// Phase offset (radians).
    pub phase_rad: f32,
    /// Gaussian noise standard deviation (kW).
    pub noise_std: f32,
}

impl Default for BaseloadConfig {
    fn default() -> Self {
        Self {
            base_kw: 0.9,
            amp_kw: 0.6,
            phase_rad: 1.2,
            noise_std: 0.05,
        }
    }
}

/// Community size and EV adoption.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommunityConfig {
    /// Homes served from each feeder node.
    pub homes_per_node: usize,
    /// Fraction of homes assumed to own an EV, in percent.
    pub adoption_pct: f32,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            homes_per_node: 1,
            adoption_pct: 90.0,
        }
    }
}

/// Shared EV charging parameters applied to every adopting home.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvConfig {
    /// Maximum charging power (kW).
    pub rating_kw: f32,
    /// Battery capacity (kWh).
    pub capacity_kwh: f32,
    /// State of charge at plug-in (0.0-1.0).
    pub initial_soc: f32,
    /// First charging-window hour (inclusive).
    pub window_start: usize,
    /// Last charging-window hour (exclusive).
    pub window_end: usize,
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            rating_kw: 4.8,
            capacity_kwh: 20.0,
            initial_soc: 0.2,
            window_start: 11,
            window_end: 23,
        }
    }
}

/// Feeder topology parameters for the synthetic line feeder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Service nodes on the feeder, excluding the substation.
    pub feeder_nodes: usize,
    /// Per-segment voltage sensitivity (pu volts per kW of downstream flow).
    pub resistance_pu_per_kw: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            feeder_nodes: 6,
            resistance_pu_per_kw: 0.0008,
        }
    }
}

/// Distributed coordination tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistributedConfig {
    /// Dual step size.
    pub kappa: f32,
    /// Hard iteration cap.
    pub iter_max: usize,
    /// Residual convergence threshold.
    pub tolerance: f32,
    /// Substation voltage (pu).
    pub vset: f32,
    /// Lower edge of the coordination band (pu).
    pub vlow: f32,
    /// Upper edge of the coordination band (pu).
    pub vhigh: f32,
    /// Per-iteration decay of in-band prices (0.0-1.0, exclusive).
    pub price_decay: f32,
}

impl Default for DistributedConfig {
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

/// Centralized solve voltage bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CentralizedConfig {
    /// Substation voltage (pu).
    pub vset: f32,
    /// Hard lower voltage bound (pu).
    pub vmin: f32,
    /// Hard upper voltage bound (pu).
    pub vmax: f32,
}

impl Default for CentralizedConfig {
    fn default() -> Self {
        Self {
            vset: 1.03,
            vmin: 0.90,
            vmax: 1.05,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"ev.initial_soc"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

/// Strategy names accepted by `scenario.strategy`.
pub const STRATEGIES: &[&str] = &["individual", "centralized", "distributed"];

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self {
            scenario: ScenarioParams::default(),
            tariff: TariffConfig::default(),
            baseload: BaseloadConfig::default(),
            community: CommunityConfig::default(),
            ev: EvConfig::default(),
            network: NetworkConfig::default(),
            distributed: DistributedConfig::default(),
            centralized: CentralizedConfig::default(),
        }
    }

    /// Returns the congested preset: a longer, weaker feeder with full EV
    /// adoption, where uncoordinated charging sags well below the band.
    pub fn congested() -> Self {
        Self {
            community: CommunityConfig {
                homes_per_node: 2,
                adoption_pct: 100.0,
            },
            network: NetworkConfig {
                feeder_nodes: 8,
                resistance_pu_per_kw: 0.0012,
            },
            distributed: DistributedConfig {
                kappa: 8.0,
                iter_max: 25,
                ..DistributedConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "congested"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "congested" => Ok(Self::congested()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.scenario;

        if s.horizon_hours == 0 {
            errors.push(ConfigError {
                field: "scenario.horizon_hours".into(),
                message: "must be > 0".into(),
            });
        }
        if !STRATEGIES.contains(&s.strategy.as_str()) {
            errors.push(ConfigError {
                field: "scenario.strategy".into(),
                message: format!(
                    "must be one of {}, got \"{}\"",
                    STRATEGIES.join(", "),
                    s.strategy
                ),
            });
        }

        if self.tariff.prices.len() != s.horizon_hours {
            errors.push(ConfigError {
                field: "tariff.prices".into(),
                message: format!(
                    "must have one entry per horizon hour ({}), got {}",
                    s.horizon_hours,
                    self.tariff.prices.len()
                ),
            });
        }
        if self.tariff.prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            errors.push(ConfigError {
                field: "tariff.prices".into(),
                message: "entries must be finite and non-negative".into(),
            });
        }

        let ev = &self.ev;
        if ev.rating_kw <= 0.0 {
            errors.push(ConfigError {
                field: "ev.rating_kw".into(),
                message: "must be > 0".into(),
            });
        }
        if ev.capacity_kwh <= 0.0 {
            errors.push(ConfigError {
                field: "ev.capacity_kwh".into(),
                message: "must be > 0".into(),
            });
        }
        if !(0.0..=1.0).contains(&ev.initial_soc) {
            errors.push(ConfigError {
                field: "ev.initial_soc".into(),
                message: "must be in [0.0, 1.0]".into(),
            });
        }
        if ev.window_start >= ev.window_end {
            errors.push(ConfigError {
                field: "ev.window_start".into(),
                message: "must be < ev.window_end".into(),
            });
        }
        if ev.window_end > s.horizon_hours {
            errors.push(ConfigError {
                field: "ev.window_end".into(),
                message: "must be <= scenario.horizon_hours".into(),
            });
        }

        let c = &self.community;
        if c.homes_per_node == 0 {
            errors.push(ConfigError {
                field: "community.homes_per_node".into(),
                message: "must be > 0".into(),
            });
        }
        if !(0.0..=100.0).contains(&c.adoption_pct) {
            errors.push(ConfigError {
                field: "community.adoption_pct".into(),
                message: "must be in [0.0, 100.0]".into(),
            });
        }

        let n = &self.network;
        if n.feeder_nodes == 0 {
            errors.push(ConfigError {
                field: "network.feeder_nodes".into(),
                message: "must be > 0".into(),
            });
        }
        if n.resistance_pu_per_kw <= 0.0 {
            errors.push(ConfigError {
                field: "network.resistance_pu_per_kw".into(),
                message: "must be > 0".into(),
            });
        }

        let d = &self.distributed;
        if d.kappa <= 0.0 {
            errors.push(ConfigError {
                field: "distributed.kappa".into(),
                message: "must be > 0".into(),
            });
        }
        if d.vlow >= d.vhigh {
            errors.push(ConfigError {
                field: "distributed.vlow".into(),
                message: "must be < distributed.vhigh".into(),
            });
        }
        if d.vset < d.vlow || d.vset > d.vhigh {
            errors.push(ConfigError {
                field: "distributed.vset".into(),
                message: "must lie within [vlow, vhigh]".into(),
            });
        }
        if d.tolerance < 0.0 {
            errors.push(ConfigError {
                field: "distributed.tolerance".into(),
                message: "must be >= 0".into(),
            });
        }
        if !(0.0..1.0).contains(&d.price_decay) {
            errors.push(ConfigError {
                field: "distributed.price_decay".into(),
                message: "must be in [0.0, 1.0)".into(),
            });
        }

        let z = &self.centralized;
        if z.vmin >= z.vmax {
            errors.push(ConfigError {
                field: "centralized.vmin".into(),
                message: "must be < centralized.vmax".into(),
            });
        }
        if z.vset < z.vmin || z.vset > z.vmax {
            errors.push(ConfigError {
                field: "centralized.vset".into(),
                message: "must lie within [vmin, vmax]".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn default_tariff_covers_the_day() {
        let t = TariffConfig::default();
        assert_eq!(t.prices.len(), 24);
        assert_eq!(t.shift_hours, 6);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[scenario]
horizon_hours = 4
seed = 99
strategy = "individual"

[tariff]
prices = [0.1, 0.2, 0.1, 0.2]
shift_hours = 0

[ev]
rating_kw = 7.2
capacity_kwh = 40.0
initial_soc = 0.5
window_start = 0
window_end = 4

[network]
feeder_nodes = 3
resistance_pu_per_kw = 0.001
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.scenario.horizon_hours), Some(4));
        assert_eq!(cfg.as_ref().map(|c| c.ev.rating_kw), Some(7.2));
        // community keeps defaults
        assert_eq!(cfg.as_ref().map(|c| c.community.homes_per_node), Some(1));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[scenario]
horizon_hours = 24
bogus_field = true
"#;
        let result = ScenarioConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validation_catches_bad_strategy() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.scenario.strategy = "bogus".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "scenario.strategy"));
    }

    #[test]
    fn validation_catches_invalid_soc() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.ev.initial_soc = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "ev.initial_soc"));
    }

    #[test]
    fn validation_catches_window_past_horizon() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.ev.window_end = 30;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "ev.window_end"));
    }

    #[test]
    fn validation_catches_inverted_band() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.distributed.vlow = 1.06;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "distributed.vlow"));
    }

    #[test]
    fn validation_catches_tariff_length_mismatch() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.tariff.prices.pop();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "tariff.prices"));
    }

    #[test]
    fn congested_is_tighter_than_baseline() {
        let base = ScenarioConfig::baseline();
        let congested = ScenarioConfig::congested();
        assert!(congested.network.resistance_pu_per_kw > base.network.resistance_pu_per_kw);
        assert!(congested.community.adoption_pct >= base.community.adoption_pct);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[scenario]
seed = 7
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.scenario.seed), Some(7));
        assert_eq!(cfg.as_ref().map(|c| c.scenario.horizon_hours), Some(24));
        assert_eq!(cfg.as_ref().map(|c| c.distributed.iter_max), Some(15));
    }
}
