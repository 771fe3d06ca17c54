//! Phone-side path dispatch.

use std::str::FromStr;

use contracts::{ClockCorrection, ContractError, MessagePath, SensorKind, SyncedSample};
use tracing::{trace, warn};

use crate::streams::RecordingStreams;

/// What happened to one incoming message
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Decoded, corrected and buffered
    Appended(SensorKind),
    /// Control or probe path; the caller handles it
    NotData(MessagePath),
    /// Unknown path or malformed payload; already logged
    Rejected(ContractError),
}

/// Demultiplexer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    pub appended: u64,
    pub rejected: u64,
    pub out_of_order: u64,
}

/// Routes data messages of one recording into its streams
#[derive(Debug)]
pub struct Demultiplexer {
    correction: ClockCorrection,
    streams: RecordingStreams,
    stats: DemuxStats,
}

impl Demultiplexer {
    pub fn new(correction: ClockCorrection) -> Self {
        Self {
            correction,
            streams: RecordingStreams::new(),
            stats: DemuxStats::default(),
        }
    }

    pub fn correction(&self) -> ClockCorrection {
        self.correction
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    pub fn streams(&self) -> &RecordingStreams {
        &self.streams
    }

    pub fn streams_mut(&mut self) -> &mut RecordingStreams {
        &mut self.streams
    }

    /// Dispatch one message by its raw path
    ///
    /// Failures are local to the message: they are logged, counted and
    /// returned, and the next message is processed normally.
    pub fn dispatch(&mut self, path: &str, payload: &[u8]) -> DispatchOutcome {
        let parsed = match MessagePath::from_str(path) {
            Ok(p) => p,
            Err(e) => return self.reject(path, e),
        };

        let Some(kind) = parsed.sensor_kind() else {
            return DispatchOutcome::NotData(parsed);
        };

        let sample = match codec::decode_kind(kind, payload) {
            Ok(s) => s,
            Err(e) => return self.reject(path, e),
        };

        let (corrected, synchronized) = self.correction.apply(sample.timestamp_nanos());
        let in_order = self.streams.push(SyncedSample {
            kind,
            sample,
            corrected_timestamp_nanos: corrected,
            synchronized,
        });

        self.stats.appended += 1;
        observability::record_sample_received(kind, synchronized);
        if !in_order {
            self.stats.out_of_order += 1;
            observability::record_out_of_order(kind);
        }
        trace!(kind = %kind, corrected, "sample appended");

        DispatchOutcome::Appended(kind)
    }

    fn reject(&mut self, path: &str, error: ContractError) -> DispatchOutcome {
        warn!(path = %path, error = %error, "dropping incoming message");
        self.stats.rejected += 1;
        observability::record_payload_rejected(path);
        DispatchOutcome::Rejected(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ClockOffsetEstimate, SensorSample};

    fn corrected_demux(offset: i64) -> Demultiplexer {
        Demultiplexer::new(ClockCorrection::Synchronized(ClockOffsetEstimate {
            offset_nanos: offset,
            round_trip_delay_nanos: 0,
        }))
    }

    #[test]
    fn test_corrupted_message_skipped() {
        let mut demux = corrected_demux(0);
        let path = MessagePath::AccelerometerData.as_str();

        let mut rejected = 0;
        for i in 0..10i64 {
            let bytes = codec::encode(&SensorSample::three_axis(i as f32, 0.0, 0.0, i));
            let payload: &[u8] = if i == 4 { &bytes[..15] } else { &bytes };
            if let DispatchOutcome::Rejected(err) = demux.dispatch(path, payload) {
                assert!(matches!(err, ContractError::MalformedPayload { .. }));
                rejected += 1;
            }
        }

        assert_eq!(rejected, 1);
        let kept: Vec<_> = demux
            .streams_mut()
            .drain()
            .iter()
            .map(|s| s.sample.timestamp_nanos())
            .collect();
        assert_eq!(kept, vec![0, 1, 2, 3, 5, 6, 7, 8, 9]);
        assert_eq!(demux.stats().rejected, 1);
        assert_eq!(demux.stats().appended, 9);
    }

    #[test]
    fn test_offset_applied() {
        let mut demux = corrected_demux(1_000_000);
        let bytes = codec::encode(&SensorSample::heart_rate(61, 5_000_000_000));
        demux.dispatch(MessagePath::HeartRateData.as_str(), &bytes);

        let sample = demux.streams_mut().drain()[0];
        assert_eq!(sample.corrected_timestamp_nanos, 4_999_000_000);
        assert_eq!(sample.sample.timestamp_nanos(), 5_000_000_000);
        assert!(sample.synchronized);
    }

    #[test]
    fn test_unsynchronized_passthrough() {
        let mut demux = Demultiplexer::new(ClockCorrection::Unsynchronized);
        let bytes = codec::encode(&SensorSample::scalar(21.5, 42));
        demux.dispatch(MessagePath::AmbientTemperatureData.as_str(), &bytes);

        let sample = demux.streams_mut().drain()[0];
        assert_eq!(sample.corrected_timestamp_nanos, 42);
        assert!(!sample.synchronized);
    }

    #[test]
    fn test_control_and_unknown_paths() {
        let mut demux = corrected_demux(0);
        assert!(matches!(
            demux.dispatch("stop-transfer", &[]),
            DispatchOutcome::NotData(MessagePath::StopTransfer)
        ));
        assert!(matches!(
            demux.dispatch("magnetometer-data", &[0u8; 20]),
            DispatchOutcome::Rejected(ContractError::UnknownPath { .. })
        ));
        assert_eq!(demux.streams().pending_len(), 0);
    }

    #[test]
    fn test_out_of_order_counted() {
        let mut demux = corrected_demux(0);
        let path = MessagePath::GyroscopeData.as_str();
        for ts in [100, 50, 200] {
            demux.dispatch(path, &codec::encode(&SensorSample::three_axis(0.0, 0.0, 0.0, ts)));
        }
        assert_eq!(demux.stats().out_of_order, 1);
        assert_eq!(demux.streams().pending_len(), 3);
    }
}
