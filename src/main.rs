//! Scheduler entry point: CLI wiring, strategy dispatch, and reporting.

use std::path::Path;
use std::process;

use ev_sched::builder::build_scenario;
use ev_sched::config::ScenarioConfig;
use ev_sched::io::export::export_csv;
use ev_sched::report::SummaryReport;
use ev_sched::solve::{
    CoordinationConfig, Coordinator, MeritOrderSolver, ScheduleSet, VoltageBounds,
    run_centralized, run_individual,
};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    strategy_override: Option<String>,
    seed_override: Option<u64>,
    schedule_out: Option<String>,
}

fn print_help() {
    eprintln!("ev-sched — residential EV charging scheduler");
    eprintln!();
    eprintln!("Usage: ev-sched [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>       Load scenario from TOML config file");
    eprintln!("  --preset <name>         Use a built-in preset (baseline, congested)");
    eprintln!("  --strategy <name>       Override strategy (individual, centralized, distributed)");
    eprintln!("  --seed <u64>            Override random seed");
    eprintln!("  --schedule-out <path>   Export per-home schedules to CSV");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        strategy_override: None,
        seed_override: None,
        schedule_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--strategy" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --strategy requires a name argument");
                    process::exit(1);
                }
                cli.strategy_override = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                if let Ok(s) = args[i].parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                    process::exit(1);
                }
            }
            "--schedule-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --schedule-out requires a path argument");
                    process::exit(1);
                }
                cli.schedule_out = Some(args[i].clone());
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        scenario.scenario.seed = seed;
    }
    if let Some(strategy) = cli.strategy_override {
        scenario.scenario.strategy = strategy;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let (tariff, homes, network) = match build_scenario(&scenario) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let solver = MeritOrderSolver;
    let set: ScheduleSet = match scenario.scenario.strategy.as_str() {
        "individual" => match run_individual(&tariff, &homes, &solver) {
            Ok(set) => set,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        "centralized" => {
            let z = &scenario.centralized;
            let bounds = VoltageBounds {
                vset: z.vset,
                vmin: z.vmin,
                vmax: z.vmax,
            };
            match run_centralized(&tariff, &homes, &network, &bounds, &solver) {
                Ok(set) => set,
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }
        _ => {
            let d = &scenario.distributed;
            let config = CoordinationConfig {
                kappa: d.kappa,
                iter_max: d.iter_max,
                tolerance: d.tolerance,
                vset: d.vset,
                vlow: d.vlow,
                vhigh: d.vhigh,
                price_decay: d.price_decay,
            };
            let coordinator = Coordinator::new(&solver, config);
            match coordinator.run(&tariff, &homes, &network) {
                Ok(result) => {
                    println!(
                        "Distributed solve: {} iterations, residual {:.6}, converged: {}",
                        result.iterations, result.residual, result.converged
                    );
                    result.set
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }
    };

    // Per-home schedule lines
    for (home, solution) in &set.schedules {
        println!(
            "{home}: charged {:>6.2} kWh, final SOC {:>5.1}%",
            solution.charged_energy_kwh(),
            solution.soc.last().copied().unwrap_or(0.0) * 100.0
        );
    }
    for failure in &set.failures {
        eprintln!("failed: {}", failure.error);
    }

    // Summary against the distributed band (informative for all strategies)
    let d = &scenario.distributed;
    let report = SummaryReport::from_schedules(&tariff, &network, &set, d.vset, d.vlow, d.vhigh);
    println!("\n{report}");

    // Export CSV if requested
    if let Some(ref path) = cli.schedule_out {
        if let Err(e) = export_csv(&set.schedules, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Schedules written to {path}");
    }
}
