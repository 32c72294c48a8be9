//! # longfast
//!
//! CLI for LongFast flood propagation animations.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use longfast_lora::RadioConfig;
use longfast_model::load_scenario;
use longfast_runner::{
    contention_free_schedule, run_animation, AirtimeReport, RadioOverrides, RunPlan,
    RunnerError, ScenarioOverrides,
};

// ============================================================================
// CLI Configuration
// ============================================================================

/// LongFast - mesh flood propagation animator
#[derive(Parser, Debug)]
#[command(name = "longfast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at info level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate propagation and produce frames
    Run(RunConfig),
    /// Print LoRa time on air for radio parameters
    Airtime(RadioOverrides),
    /// Print BFS hop waves from the seed tower
    Waves(ScenarioArgs),
    /// Print the contention-free wave schedule
    Schedule(ScenarioArgs),
    /// List all metrics with descriptions and labels
    Metrics,
}

/// A scenario file plus overrides.
#[derive(Parser, Debug)]
pub struct ScenarioArgs {
    /// Path to the YAML scenario
    pub scenario: PathBuf,

    #[command(flatten)]
    pub overrides: ScenarioOverrides,
}

/// Configuration for a full run
#[derive(Parser, Debug)]
pub struct RunConfig {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Write every frame as JSON Lines to this file
    #[arg(long, value_name = "FILE")]
    pub frames_out: Option<PathBuf>,
}

fn load(args: &ScenarioArgs) -> Result<longfast_model::Scenario, RunnerError> {
    let mut scenario = load_scenario(&args.scenario)?;
    args.overrides.apply(&mut scenario)?;
    Ok(scenario)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), RunnerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), RunnerError> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warn, or info with --verbose
    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run(config) => {
            let scenario = load(&config.scenario)?;
            let summary = match &config.frames_out {
                Some(path) => {
                    let mut writer = BufWriter::new(File::create(path)?);
                    let summary = run_animation(&scenario, Some(&mut writer))?;
                    writer.flush()?;
                    summary
                }
                None => run_animation(&scenario, None)?,
            };
            print_json(&summary)?;
        }
        Commands::Airtime(radio) => {
            let mut config = RadioConfig::long_fast();
            radio.apply(&mut config);
            print_json(&AirtimeReport::new(config)?)?;
        }
        Commands::Waves(args) => {
            let scenario = load(&args)?;
            let plan = RunPlan::new(&scenario)?;
            print_json(&plan.waves)?;
        }
        Commands::Schedule(args) => {
            let scenario = load(&args)?;
            print_json(&contention_free_schedule(&scenario)?)?;
        }
        Commands::Metrics => {
            print_metrics_info();
        }
    }

    Ok(())
}

/// Print information about all available metrics
fn print_metrics_info() {
    use longfast_metrics::metric_defs;

    println!("LongFast Available Metrics");
    println!("==========================\n");

    println!("All metrics carry the following label:");
    println!("  - pass: simulation pass (dry, render)");
    println!();

    let categories = [
        ("Transmissions", "longfast.sim.tx_"),
        ("Coverage", "longfast.sim."),
        ("Frames", "longfast.frames."),
    ];

    let mut listed = std::collections::BTreeSet::new();
    for (category_name, prefix) in categories {
        println!("## {}\n", category_name);

        for metric in metric_defs::ALL {
            if !metric.name.starts_with(prefix) || !listed.insert(metric.name) {
                continue;
            }
            println!("  {}", metric.name);
            println!("    Type: {}", metric.kind);
            let unit_str = metric.unit_str();
            if !unit_str.is_empty() {
                println!("    Unit: {}", unit_str);
            }
            if !metric.description.is_empty() {
                println!("    Description: {}", metric.description);
            }
            println!();
        }
    }

    println!("Nothing is recorded unless the embedding application installs a recorder");
    println!("and then calls longfast_metrics::describe_metrics().");
}
