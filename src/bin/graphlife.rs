use std::{path::PathBuf, process};

use clap::Parser;
use graphlife::{AppConfig, GraphLifeError, LifecycleController};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Provision, seed and exercise a graph store, or drop it.
#[derive(Debug, Parser)]
#[command(name = "graphlife", version)]
struct Cli {
    /// TOML configuration file; an in-memory store is used when omitted.
    config: Option<PathBuf>,
    /// Pass `drop` to destroy the store instead of running the lifecycle.
    mode: Option<String>,
    /// Override the number of update/read cycles.
    #[arg(long)]
    cycles: Option<usize>,
    /// Skip the pauses between stages.
    #[arg(long)]
    no_pacing: bool,
    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() {
    install_tracing_subscriber();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {err}");
                process::exit(2);
            }
        },
        None => AppConfig::default(),
    };
    if let Some(cycles) = cli.cycles {
        config.run.cycles = cycles;
    }

    let drop_mode = match cli.mode.as_deref() {
        Some(mode) if mode.eq_ignore_ascii_case("drop") => true,
        Some(other) => {
            warn!(mode = other, "unknown mode ignored; running the lifecycle");
            false
        }
        None => false,
    };

    let mut controller = LifecycleController::from_config(&config);
    if cli.no_pacing {
        controller = controller.without_pacing();
    }

    if let Err(err) = execute(&mut controller, drop_mode, cli.json) {
        error!(error = %err, "run aborted");
        process::exit(1);
    }
}

fn execute(
    controller: &mut LifecycleController,
    drop_mode: bool,
    json: bool,
) -> Result<(), GraphLifeError> {
    if drop_mode {
        info!("dropping graph");
        return controller.run_drop();
    }
    let report = controller.run()?;
    if !report.errors.is_empty() {
        warn!(failures = report.errors.len(), "run finished with contained failures");
    }
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => error!(error = %err, "failed to render report"),
        }
    }
    Ok(())
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
