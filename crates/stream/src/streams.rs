//! Per-kind sample streams of an open recording.

use std::collections::BTreeMap;

use contracts::{SensorKind, SyncedSample};

/// Arrival bookkeeping for one sensor kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleStream {
    total: u64,
    out_of_order: u64,
    last_corrected_nanos: Option<i64>,
}

impl SampleStream {
    /// Track one arrival; returns false if it went backwards in time
    fn record(&mut self, corrected_nanos: i64) -> bool {
        self.total += 1;
        let in_order = match self.last_corrected_nanos {
            Some(last) if corrected_nanos < last => {
                self.out_of_order += 1;
                false
            }
            _ => true,
        };
        self.last_corrected_nanos = Some(corrected_nanos);
        in_order
    }

    /// Samples appended so far
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Arrivals older than their predecessor
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    pub fn last_corrected_nanos(&self) -> Option<i64> {
        self.last_corrected_nanos
    }
}

/// Append-only buffer between the demultiplexer and the record store
///
/// Samples are kept in arrival order and never reordered; out-of-order
/// arrivals are only counted.
#[derive(Debug, Default)]
pub struct RecordingStreams {
    pending: Vec<SyncedSample>,
    streams: BTreeMap<SensorKind, SampleStream>,
}

impl RecordingStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample; returns false if it arrived out of order
    pub fn push(&mut self, sample: SyncedSample) -> bool {
        let in_order = self
            .streams
            .entry(sample.kind)
            .or_default()
            .record(sample.corrected_timestamp_nanos);
        self.pending.push(sample);
        in_order
    }

    /// Samples buffered since the last drain
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Hand buffered samples over for persistence, in arrival order
    pub fn drain(&mut self) -> Vec<SyncedSample> {
        std::mem::take(&mut self.pending)
    }

    pub fn stream(&self, kind: SensorKind) -> Option<&SampleStream> {
        self.streams.get(&kind)
    }

    pub fn streams(&self) -> impl Iterator<Item = (SensorKind, &SampleStream)> {
        self.streams.iter().map(|(k, s)| (*k, s))
    }

    /// Samples appended over the recording's lifetime
    pub fn total(&self) -> u64 {
        self.streams.values().map(SampleStream::total).sum()
    }

    pub fn out_of_order(&self) -> u64 {
        self.streams.values().map(SampleStream::out_of_order).sum()
    }

    /// Release every buffer and counter; returns what was still pending
    pub fn take_all(&mut self) -> Vec<SyncedSample> {
        self.streams.clear();
        let pending = std::mem::take(&mut self.pending);
        self.pending.shrink_to_fit();
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorSample;

    fn synced(kind: SensorKind, ts: i64) -> SyncedSample {
        SyncedSample {
            kind,
            sample: SensorSample::scalar(0.0, ts),
            corrected_timestamp_nanos: ts,
            synchronized: true,
        }
    }

    #[test]
    fn test_out_of_order_counted_not_reordered() {
        let mut streams = RecordingStreams::new();
        assert!(streams.push(synced(SensorKind::AmbientTemperature, 10)));
        assert!(!streams.push(synced(SensorKind::AmbientTemperature, 5)));
        // other kinds are tracked independently
        assert!(streams.push(synced(SensorKind::HeartRate, 1)));

        let drained = streams.drain();
        let order: Vec<_> = drained.iter().map(|s| s.corrected_timestamp_nanos).collect();
        assert_eq!(order, vec![10, 5, 1]);
        assert_eq!(streams.out_of_order(), 1);
        assert_eq!(streams.pending_len(), 0);
        assert_eq!(streams.total(), 3);
    }

    #[test]
    fn test_take_all_releases_everything() {
        let mut streams = RecordingStreams::new();
        streams.push(synced(SensorKind::Gravity, 1));
        streams.drain();
        streams.push(synced(SensorKind::Gravity, 2));

        let rest = streams.take_all();
        assert_eq!(rest.len(), 1);
        assert_eq!(streams.total(), 0);
        assert!(streams.stream(SensorKind::Gravity).is_none());
    }
}
