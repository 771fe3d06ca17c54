//! Loopback simulation: a watch node with mock sensors and a phone node
//! recording into an in-memory store, joined by a loopback link.

mod report;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{LinkConfig, MonotonicClock, PeerId, RecordStore, SensorSource};
use dataset::ExportSink;
use link::{LinkFaults, LoopbackTransport, MemoryRecordStore, PhoneNode, WatchNode};
use observability::{LinkMetricsAggregator, ProbeOutcome};
use stream::MockSensorSource;
use tracing::{info, instrument, warn};

pub use report::SimulationReport;

/// One simulated recording session
#[derive(Debug, Clone)]
pub struct Simulation {
    config: LinkConfig,
    export: bool,
}

impl Simulation {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            export: true,
        }
    }

    /// Skip writing the dataset after the recording closes
    pub fn without_export(mut self) -> Self {
        self.export = false;
        self
    }

    /// Record until the configured duration elapses or `interrupt` resolves,
    /// whichever comes first. The recording is stopped and exported either way.
    #[instrument(name = "simulation", skip(self, interrupt), fields(title = %self.config.simulation.title))]
    pub async fn run_until(self, interrupt: impl Future<Output = ()>) -> Result<SimulationReport> {
        let start_time = Instant::now();
        let sim = &self.config.simulation;

        let watch_id = PeerId::parse("watch")?;
        let phone_id = PeerId::parse("phone")?;
        let faults = LinkFaults {
            corrupt_every: sim.corrupt_every,
            drop_every: 0,
        };
        let (watch_link, phone_link) =
            LoopbackTransport::pair_with_faults(watch_id.clone(), phone_id, faults);

        // Watch side
        let watch_clock = Arc::new(MonotonicClock::with_offset(
            sim.watch_clock_offset_ms.saturating_mul(1_000_000),
        ));
        let sources: Vec<Box<dyn SensorSource>> = sim
            .sensors
            .iter()
            .map(|s| {
                Box::new(MockSensorSource::with_frequency(
                    s.kind,
                    s.frequency_hz,
                    watch_clock.clone(),
                )) as Box<dyn SensorSource>
            })
            .collect();
        let watch = WatchNode::start(watch_link.clone(), watch_clock, sources);

        // Phone side
        let store = Arc::new(MemoryRecordStore::new());
        let phone = PhoneNode::spawn(
            phone_link.clone(),
            Arc::new(MonotonicClock::new()),
            store.clone(),
            &self.config,
        );

        info!(
            sensors = sim.sensors.len(),
            offset_ms = sim.watch_clock_offset_ms,
            corrupt_every = sim.corrupt_every,
            "Simulation ready"
        );

        let started = match phone.start_recording(&watch_id, &sim.title).await {
            Ok(recording) => recording,
            Err(e) => {
                watch.shutdown();
                phone.shutdown().await;
                return Err(e).context("Failed to start recording");
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(sim.duration()) => {
                info!(duration_ms = sim.duration_ms, "Capture window elapsed");
            }
            _ = interrupt => {
                warn!("Interrupted, stopping recording early");
            }
        }

        let closed = phone
            .stop_recording()
            .await
            .context("Failed to stop recording")?
            .context("Recording was never opened")?;
        let demux = phone.demux_stats().await;
        let watch_stats = watch.stats();
        watch.shutdown();

        let export_path = if self.export {
            let mut sink = ExportSink::for_format(self.config.export.format);
            phone
                .export(closed.id, &mut sink)
                .await
                .context("Failed to export dataset")?
        } else {
            None
        };

        let samples = store
            .samples(closed.id)
            .await
            .context("Failed to read recorded samples")?;
        let recording = store
            .get_by_id(closed.id)
            .await?
            .unwrap_or(closed);
        let inbound_dropped = phone.inbound_dropped();
        phone.shutdown().await;

        let mut metrics = LinkMetricsAggregator::new();
        match started.clock_estimate() {
            Some(est) => metrics.record_probe(ProbeOutcome::Answered, Some(&est)),
            None => metrics.record_probe(ProbeOutcome::TimedOut, None),
        }
        for sample in &samples {
            metrics.record_samples(sample.kind, 1, sample.synchronized);
        }
        metrics.record_rejected(demux.rejected);
        metrics.record_out_of_order(demux.out_of_order);

        Ok(SimulationReport {
            recording,
            duration: start_time.elapsed(),
            watch: watch_stats,
            link: watch_link.stats(),
            demux,
            inbound_dropped,
            metrics,
            export_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CloseReason, ExportFormat, RecordingStatus, SensorKind, SimulatedSensor};

    fn quick_config(dir: &std::path::Path) -> LinkConfig {
        let mut config = LinkConfig::default();
        config.clock_sync.probe_count = 2;
        config.clock_sync.probe_interval_ms = 0;
        config.simulation.duration_ms = 120;
        config.simulation.watch_clock_offset_ms = 2_000;
        config.simulation.sensors = vec![
            SimulatedSensor::new(SensorKind::Accelerometer, 200.0),
            SimulatedSensor::new(SensorKind::HeartRate, 50.0),
        ];
        config.export.directory = dir.to_path_buf();
        config.export.format = ExportFormat::Jsonl;
        config
    }

    #[tokio::test]
    async fn test_simulation_records_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let report = Simulation::new(quick_config(dir.path()))
            .run_until(std::future::pending())
            .await
            .unwrap();

        assert!(report.recording.is_synchronized());
        assert_eq!(report.recording.status, RecordingStatus::Exported);
        assert_eq!(report.recording.close_reason, Some(CloseReason::Stopped));
        assert!(report.recording.sample_count > 0);
        assert_eq!(report.metrics.rejected, 0);

        // offset estimate lands near the configured 2 s
        let offset = report.recording.clock_offset_nanos.unwrap();
        assert!((offset - 2_000_000_000).abs() < 100_000_000, "offset {offset}");

        let path = report.export_path.unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "jsonl");
        let lines = std::fs::read_to_string(&path).unwrap().lines().count() as u64;
        assert_eq!(lines, report.recording.sample_count);
    }

    #[tokio::test]
    async fn test_interrupt_still_closes_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick_config(dir.path());
        config.simulation.duration_ms = 60_000;

        let report = Simulation::new(config)
            .without_export()
            .run_until(async {})
            .await
            .unwrap();

        assert!(report.export_path.is_none());
        assert_eq!(report.recording.status, RecordingStatus::Closed);
        assert!(report.duration.as_secs() < 10);
    }
}
