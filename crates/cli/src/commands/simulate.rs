//! `simulate` command implementation.

use anyhow::{Context, Result};
use contracts::LinkConfig;
use tracing::{error, info};

use crate::cli::SimulateArgs;
use crate::simulation::Simulation;

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let config = load_config(args)?;

    info!(
        title = %config.simulation.title,
        duration_ms = config.simulation.duration_ms,
        sensors = config.simulation.sensors.len(),
        require_sync = config.clock_sync.require_sync,
        "Configuration loaded"
    );

    let mut simulation = Simulation::new(config);
    if args.no_export {
        simulation = simulation.without_export();
    }

    info!("Starting simulation...");
    let report = simulation
        .run_until(shutdown_signal())
        .await
        .context("Simulation failed")?;

    info!(
        recording = %report.recording.id,
        samples = report.recording.sample_count,
        rejected = report.demux.rejected,
        duration_secs = report.duration.as_secs_f64(),
        "Simulation completed"
    );
    report.print_summary();

    Ok(())
}

/// Load the configuration (defaults when no file is given) and apply CLI overrides
fn load_config(args: &SimulateArgs) -> Result<LinkConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            config_loader::ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using defaults");
            LinkConfig::default()
        }
    };

    if let Some(ref title) = args.title {
        config.simulation.title = title.clone();
    }
    if let Some(duration_ms) = args.duration_ms {
        config.simulation.duration_ms = duration_ms;
    }
    if let Some(offset_ms) = args.watch_offset_ms {
        config.simulation.watch_clock_offset_ms = offset_ms;
    }
    if let Some(corrupt_every) = args.corrupt_every {
        config.simulation.corrupt_every = corrupt_every;
    }
    if let Some(ref output) = args.output {
        config.export.directory = output.clone();
    }

    config_loader::ConfigLoader::validate(&config).context("Invalid command-line override")?;
    Ok(config)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
