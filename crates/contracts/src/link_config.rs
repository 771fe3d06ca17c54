//! LinkConfig - Config Loader output
//!
//! Tunables for clock sync, session handling, export and the CLI simulation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::{ExportLayout, SensorKind};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LinkConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    #[validate(nested)]
    pub clock_sync: ClockSyncConfig,

    #[serde(default)]
    #[validate(nested)]
    pub session: SessionConfig,

    #[serde(default)]
    #[validate(nested)]
    pub export: ExportConfig,

    #[serde(default)]
    #[validate(nested)]
    pub simulation: SimulationConfig,
}

/// Ping/pong probing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClockSyncConfig {
    /// Probes per batch; the minimum-delay result wins
    #[validate(range(min = 1, max = 64))]
    pub probe_count: usize,

    /// Per-probe reply window
    #[validate(range(min = 1))]
    pub probe_timeout_ms: u64,

    /// Pause between consecutive probes of a batch
    pub probe_interval_ms: u64,

    /// Probes slower than this are discarded as outliers
    #[validate(range(min = 1))]
    pub max_round_trip_ms: Option<u64>,

    /// Refuse to start a recording without an offset estimate
    pub require_sync: bool,
}

impl Default for ClockSyncConfig {
    fn default() -> Self {
        Self {
            probe_count: 5,
            probe_timeout_ms: 500,
            probe_interval_ms: 20,
            max_round_trip_ms: None,
            require_sync: true,
        }
    }
}

impl ClockSyncConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn max_round_trip_nanos(&self) -> Option<u64> {
        self.max_round_trip_ms.map(|ms| ms.saturating_mul(1_000_000))
    }
}

/// Phone-side session handling
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionConfig {
    /// Bounded queue between transport callbacks and the message loop
    #[validate(range(min = 1))]
    pub inbound_queue_capacity: usize,

    /// Buffered samples that trigger a write to the record store
    #[validate(range(min = 1))]
    pub persist_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inbound_queue_capacity: 1024,
            persist_batch_size: 256,
        }
    }
}

/// Export file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
        }
    }
}

/// Dataset export
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: PathBuf,
    pub format: ExportFormat,
    pub layout: ExportLayout,

    /// Bucket width for the wide layout, at most one day
    #[validate(range(max = 86_400_000))]
    pub bucket_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./exports"),
            format: ExportFormat::Csv,
            layout: ExportLayout::Long,
            bucket_ms: 20,
        }
    }
}

impl ExportConfig {
    pub fn bucket_nanos(&self) -> i64 {
        i64::try_from(self.bucket_ms)
            .unwrap_or(i64::MAX)
            .saturating_mul(1_000_000)
    }
}

/// Loopback simulation driven by the CLI
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SimulationConfig {
    /// Recording title
    #[validate(length(min = 1))]
    pub title: String,

    /// How far the simulated watch clock runs ahead of the phone
    pub watch_clock_offset_ms: i64,

    /// Capture length
    #[validate(range(min = 1))]
    pub duration_ms: u64,

    /// Corrupt every n-th data message (0 = never)
    pub corrupt_every: u64,

    /// Simulated sensors; kinds not listed are not streamed
    #[validate(nested)]
    pub sensors: Vec<SimulatedSensor>,
}

/// One simulated sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct SimulatedSensor {
    pub kind: SensorKind,

    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub frequency_hz: f64,
}

impl SimulatedSensor {
    pub fn new(kind: SensorKind, frequency_hz: f64) -> Self {
        Self { kind, frequency_hz }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let sensors = vec![
            SimulatedSensor::new(SensorKind::Accelerometer, 50.0),
            SimulatedSensor::new(SensorKind::LinearAcceleration, 50.0),
            SimulatedSensor::new(SensorKind::Gyroscope, 50.0),
            SimulatedSensor::new(SensorKind::Gravity, 25.0),
            SimulatedSensor::new(SensorKind::AmbientTemperature, 1.0),
            SimulatedSensor::new(SensorKind::HeartRate, 1.0),
        ];

        Self {
            title: "simulated session".to_string(),
            watch_clock_offset_ms: 1_500,
            duration_ms: 3_000,
            corrupt_every: 0,
            sensors,
        }
    }
}

impl SimulationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}
