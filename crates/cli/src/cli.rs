//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Wear Sync - watch-to-phone sensor streaming with clock synchronization
#[derive(Parser, Debug)]
#[command(
    name = "wear-sync",
    author,
    version,
    about = "Watch-to-phone sensor link with clock synchronization",
    long_about = "Streams wearable sensor samples to a phone over an unreliable message link.\n\n\
                  Estimates the watch clock offset with ping/pong probes, records the \n\
                  corrected samples and exports them as CSV or JSON Lines datasets."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "WEAR_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "WEAR_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 or unset = disabled)
    #[arg(long, global = true, env = "WEAR_SYNC_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a session between a simulated watch and phone over a loopback link
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "WEAR_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the recording title
    #[arg(long)]
    pub title: Option<String>,

    /// Override the capture length in milliseconds
    #[arg(long, env = "WEAR_SYNC_DURATION_MS")]
    pub duration_ms: Option<u64>,

    /// Override how far the watch clock runs ahead, in milliseconds
    #[arg(long, allow_negative_numbers = true)]
    pub watch_offset_ms: Option<i64>,

    /// Override the corruption rate (truncate every n-th data message, 0 = never)
    #[arg(long)]
    pub corrupt_every: Option<u64>,

    /// Override the export directory
    #[arg(short, long, env = "WEAR_SYNC_EXPORT_DIR")]
    pub output: Option<PathBuf>,

    /// Record without writing a dataset file
    #[arg(long)]
    pub no_export: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "wear-sync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "wear-sync.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the simulated sensors
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_overrides() {
        let cli = Cli::parse_from([
            "wear-sync",
            "-v",
            "simulate",
            "--duration-ms",
            "250",
            "--watch-offset-ms",
            "-40",
            "--no-export",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.duration_ms, Some(250));
                assert_eq!(args.watch_offset_ms, Some(-40));
                assert!(args.no_export);
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["wear-sync", "-q", "-v", "info"]).is_err());
    }
}
