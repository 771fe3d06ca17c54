//! # Observability
//!
//! Logging setup and link metrics for both nodes.
//!
//! The CLI installs the subscriber once at startup through
//! [`init_with_config`]; library crates only emit `tracing` events and call
//! the `record_*` helpers, which are no-ops until a recorder is installed.
//!
//! ```ignore
//! use observability::{init_with_config, ObservabilityConfig};
//!
//! init_with_config(ObservabilityConfig {
//!     metrics_port: Some(9000),
//!     ..Default::default()
//! })?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub use crate::metrics::{
    record_clock_estimate, record_export, record_inbound_dropped, record_out_of_order,
    record_payload_rejected, record_probe_outcome, record_recording_closed,
    record_sample_dropped, record_sample_forwarded, record_sample_received, LinkMetricsAggregator,
    LinkMetricsSummary, ProbeOutcome, RunningStats, StatsSummary,
};

/// How a process reports what the link is doing
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Serve Prometheus metrics on this port; `None` keeps them in-process
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with source locations
    Json,
    #[default]
    Pretty,
    Compact,
}

impl LogFormat {
    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self {
            Self::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            Self::Pretty => fmt::layer().pretty().boxed(),
            Self::Compact => fmt::layer().compact().boxed(),
        }
    }
}

/// Install the global subscriber and, if a port is set, the metrics endpoint
///
/// # Errors
/// Fails when a subscriber or recorder is already installed, or the
/// metrics port cannot be bound.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    tracing_subscriber::registry()
        .with(config.log_format.layer())
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "logging ready"
    );
    Ok(())
}

/// Serve the Prometheus scrape endpoint on every interface at `port`
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "metrics endpoint listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.default_log_level, "info");
    }

    #[test]
    fn test_subscriber_installs_once() {
        let config = ObservabilityConfig {
            log_format: LogFormat::Compact,
            default_log_level: "debug".to_string(),
            ..Default::default()
        };
        init_with_config(config.clone()).unwrap();

        let err = init_with_config(config).unwrap_err();
        assert!(err.to_string().contains("tracing subscriber"));
    }
}
