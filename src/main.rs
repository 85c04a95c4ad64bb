//! household-sim entry point: CLI wiring and config-driven run.

use std::path::Path;
use std::process;

use tracing::Level;

use household_sim::cli::{self, CliOptions, Command};
use household_sim::config::ScenarioConfig;
use household_sim::io::export::export_csv;
use household_sim::runner::{SimulationResult, run_scenario};

fn load_scenario(cli: &CliOptions) -> ScenarioConfig {
    // --scenario takes priority, then --preset
    let loaded = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path)
    } else {
        ScenarioConfig::from_preset(cli.preset.as_deref().unwrap_or("baseline"))
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    scenario
}

fn print_result(result: &SimulationResult) {
    for day in &result.days {
        println!("{day}");
    }
    for village in &result.villages {
        println!("\n{} ({} households)", village.name, village.population);
        for sub in &village.subscriptions {
            println!(
                "  {:<4} {:<26} {:<10} customers={:>3}  billed={:.2} kWh",
                sub.group.to_string(),
                sub.power_type.to_string(),
                sub.tariff.to_string(),
                sub.customers,
                sub.cumulative_kwh,
            );
        }
    }
    println!("\n{}", result.report);
}

fn main() {
    let cli = match cli::parse_args() {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help) => {
            cli::print_usage();
            return;
        }
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let scenario = load_scenario(&cli);

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let result = run_scenario(&scenario).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    print_result(&result);

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&result.steps, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {}", path.display());
    }

    if cli.serve {
        serve(result, cli.port);
    }
}

#[cfg(feature = "api")]
fn serve(result: SimulationResult, port: u16) {
    use std::net::SocketAddr;
    use std::sync::Arc;

    let state = Arc::new(household_sim::api::AppState::from(result));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("error: failed to create tokio runtime: {e}");
        process::exit(1);
    });
    if let Err(e) = rt.block_on(household_sim::api::serve(state, addr)) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

#[cfg(not(feature = "api"))]
fn serve(_result: SimulationResult, _port: u16) {
    eprintln!("error: --serve requires building with the `api` feature");
    process::exit(1);
}
