//! Minimum-delay selection over a probe batch.

use contracts::{ClockOffsetEstimate, ContractError};

/// Accumulates the probes of one batch
///
/// The estimate with the smallest round-trip delay wins; on a tie the
/// earlier probe is kept. Probes slower than `max_round_trip_nanos` are
/// counted as outliers and never selected.
#[derive(Debug, Clone, Default)]
pub struct ClockSyncEstimator {
    max_round_trip_nanos: Option<u64>,
    best: Option<ClockOffsetEstimate>,
    answered: usize,
    timed_out: usize,
    outliers: usize,
}

impl ClockSyncEstimator {
    pub fn new(max_round_trip_nanos: Option<u64>) -> Self {
        Self {
            max_round_trip_nanos,
            ..Default::default()
        }
    }

    /// Record an answered probe; returns whether it was usable
    pub fn record(&mut self, estimate: ClockOffsetEstimate) -> bool {
        if let Some(max) = self.max_round_trip_nanos {
            if estimate.round_trip_delay_nanos > max {
                self.outliers += 1;
                return false;
            }
        }

        self.answered += 1;
        match self.best {
            Some(best) if best.round_trip_delay_nanos <= estimate.round_trip_delay_nanos => {}
            _ => self.best = Some(estimate),
        }
        true
    }

    /// Record a probe that never got an answer
    pub fn record_timeout(&mut self) {
        self.timed_out += 1;
    }

    pub fn best(&self) -> Option<ClockOffsetEstimate> {
        self.best
    }

    /// Probes recorded so far, whatever their outcome
    pub fn attempted(&self) -> usize {
        self.answered + self.timed_out + self.outliers
    }

    pub fn answered(&self) -> usize {
        self.answered
    }

    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    pub fn outliers(&self) -> usize {
        self.outliers
    }

    /// Close the batch
    ///
    /// # Errors
    /// `ClockSyncUnavailable` when no probe was usable.
    pub fn finish(self, peer: &str) -> Result<ClockOffsetEstimate, ContractError> {
        self.best.ok_or_else(|| ContractError::ClockSyncUnavailable {
            peer: peer.to_string(),
            attempted: self.attempted(),
        })
    }
}
