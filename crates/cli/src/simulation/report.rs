//! Simulation report.

use std::path::PathBuf;
use std::time::Duration;

use contracts::Recording;
use link::LinkStatsSnapshot;
use observability::LinkMetricsAggregator;
use stream::{DemuxStats, MultiplexerSnapshot};

/// Outcome of one simulated session
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Final state of the recording
    pub recording: Recording,

    /// Wall time of the whole run
    pub duration: Duration,

    /// Watch-side forwarding counters
    pub watch: MultiplexerSnapshot,

    /// Loopback link counters
    pub link: LinkStatsSnapshot,

    /// Phone-side dispatch counters
    pub demux: DemuxStats,

    /// Events lost to a full inbound queue
    pub inbound_dropped: u64,

    pub metrics: LinkMetricsAggregator,

    /// Dataset file, when one was written
    pub export_path: Option<PathBuf>,
}

impl SimulationReport {
    /// Stored samples per second of wall time
    pub fn samples_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.recording.sample_count as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let rec = &self.recording;

        println!("\n=== Simulation Summary ===\n");

        println!("Recording {} \"{}\"", rec.id, rec.title);
        println!("   Status: {:?}", rec.status);
        if let Some(reason) = rec.close_reason {
            println!("   Closed by: {}", reason.as_str());
        }
        match rec.clock_offset_nanos {
            Some(offset) => println!(
                "   Clock offset: {:.3} ms (round trip {:.3} ms)",
                offset as f64 / 1e6,
                rec.round_trip_delay_nanos.unwrap_or(0) as f64 / 1e6
            ),
            None => println!("   Clock offset: unsynchronized"),
        }
        println!("   Samples stored: {}", rec.sample_count);
        println!(
            "   Duration: {:.2}s ({:.1} samples/s)",
            self.duration.as_secs_f64(),
            self.samples_per_second()
        );

        println!("\nLink");
        println!("   Forwarded by watch: {}", self.watch.forwarded);
        println!(
            "   Dropped without destination: {}",
            self.watch.dropped_no_destination
        );
        println!(
            "   Delivered / lost / corrupted: {} / {} / {}",
            self.link.delivered, self.link.dropped, self.link.corrupted
        );
        println!("   Inbound queue overflow: {}", self.inbound_dropped);

        println!("\nPhone");
        println!("   Appended: {}", self.demux.appended);
        println!("   Rejected: {}", self.demux.rejected);
        println!("   Out of order: {}", self.demux.out_of_order);

        match &self.export_path {
            Some(path) => println!("\nExported to {}", path.display()),
            None => println!("\nNo dataset written"),
        }

        println!("\n{}", self.metrics.summary());
    }
}
