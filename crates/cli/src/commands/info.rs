//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{LinkConfig, SensorKind};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    clock_sync: ClockSyncInfo,
    session: SessionInfo,
    export: ExportInfo,
    simulation: SimulationInfo,
}

#[derive(Serialize)]
struct ClockSyncInfo {
    probe_count: usize,
    probe_timeout_ms: u64,
    probe_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_round_trip_ms: Option<u64>,
    require_sync: bool,
    /// Worst-case time spent probing before a recording starts
    worst_case_probe_ms: u64,
}

#[derive(Serialize)]
struct SessionInfo {
    inbound_queue_capacity: usize,
    persist_batch_size: usize,
}

#[derive(Serialize)]
struct ExportInfo {
    directory: String,
    format: String,
    layout: String,
    bucket_ms: u64,
}

#[derive(Serialize)]
struct SimulationInfo {
    title: String,
    duration_ms: u64,
    watch_clock_offset_ms: i64,
    corrupt_every: u64,
    expected_samples_per_second: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    kind: SensorKind,
    path: &'static str,
    frequency_hz: f64,
    payload_bytes: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

/// Probe batch bound: every probe times out, plus the pauses between them
fn worst_case_probe_ms(config: &LinkConfig) -> u64 {
    let sync = &config.clock_sync;
    let count = sync.probe_count as u64;
    count.saturating_mul(sync.probe_timeout_ms)
        + count.saturating_sub(1).saturating_mul(sync.probe_interval_ms)
}

fn expected_samples_per_second(config: &LinkConfig) -> f64 {
    config
        .simulation
        .sensors
        .iter()
        .map(|s| s.frequency_hz)
        .sum()
}

fn build_config_info(config: &LinkConfig, args: &InfoArgs) -> ConfigInfo {
    let sensors = if args.sensors {
        config
            .simulation
            .sensors
            .iter()
            .map(|s| SensorInfo {
                kind: s.kind,
                path: s.kind.path().as_str(),
                frequency_hz: s.frequency_hz,
                payload_bytes: s.kind.shape().width(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        clock_sync: ClockSyncInfo {
            probe_count: config.clock_sync.probe_count,
            probe_timeout_ms: config.clock_sync.probe_timeout_ms,
            probe_interval_ms: config.clock_sync.probe_interval_ms,
            max_round_trip_ms: config.clock_sync.max_round_trip_ms,
            require_sync: config.clock_sync.require_sync,
            worst_case_probe_ms: worst_case_probe_ms(config),
        },
        session: SessionInfo {
            inbound_queue_capacity: config.session.inbound_queue_capacity,
            persist_batch_size: config.session.persist_batch_size,
        },
        export: ExportInfo {
            directory: config.export.directory.display().to_string(),
            format: config.export.format.extension().to_string(),
            layout: format!("{:?}", config.export.layout),
            bucket_ms: config.export.bucket_ms,
        },
        simulation: SimulationInfo {
            title: config.simulation.title.clone(),
            duration_ms: config.simulation.duration_ms,
            watch_clock_offset_ms: config.simulation.watch_clock_offset_ms,
            corrupt_every: config.simulation.corrupt_every,
            expected_samples_per_second: expected_samples_per_second(config),
            sensors,
        },
    }
}

fn print_config_info(config: &LinkConfig, args: &InfoArgs) {
    println!("=== Wear Sync Configuration ===\n");

    let sync = &config.clock_sync;
    println!("Clock Sync");
    println!(
        "   ├─ Probes: {} (timeout {} ms, interval {} ms)",
        sync.probe_count, sync.probe_timeout_ms, sync.probe_interval_ms
    );
    match sync.max_round_trip_ms {
        Some(max) => println!("   ├─ Max round trip: {} ms", max),
        None => println!("   ├─ Max round trip: (timeout)"),
    }
    println!("   ├─ Sync required: {}", sync.require_sync);
    println!("   └─ Worst-case probing: {} ms", worst_case_probe_ms(config));

    println!("\nSession");
    println!(
        "   ├─ Inbound queue: {}",
        config.session.inbound_queue_capacity
    );
    println!("   └─ Persist batch: {}", config.session.persist_batch_size);

    let export = &config.export;
    println!("\nExport");
    println!("   ├─ Directory: {}", export.directory.display());
    println!("   ├─ Format: {}", export.format.extension());
    println!("   └─ Layout: {:?} (bucket {} ms)", export.layout, export.bucket_ms);

    let sim = &config.simulation;
    println!("\nSimulation \"{}\"", sim.title);
    println!("   ├─ Duration: {} ms", sim.duration_ms);
    println!("   ├─ Watch clock offset: {} ms", sim.watch_clock_offset_ms);
    println!("   ├─ Corrupt every: {}", sim.corrupt_every);

    if args.sensors && !sim.sensors.is_empty() {
        println!("   └─ Sensors ({}):", sim.sensors.len());
        for (i, sensor) in sim.sensors.iter().enumerate() {
            let prefix = if i == sim.sensors.len() - 1 { "└─" } else { "├─" };
            println!(
                "      {} {} ({} Hz, {} bytes on '{}')",
                prefix,
                sensor.kind,
                sensor.frequency_hz,
                sensor.kind.shape().width(),
                sensor.kind.path()
            );
        }
    } else {
        println!(
            "   └─ {} sensors, ~{:.0} samples/s",
            sim.sensors.len(),
            expected_samples_per_second(config)
        );
    }

    println!();
}
