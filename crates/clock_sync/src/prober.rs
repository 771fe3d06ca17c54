//! Phone-side probing of the watch clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    Clock, ClockOffsetEstimate, ClockSyncConfig, ClockSyncProbe, ContractError, MessagePath,
    MessageTransport, PeerId,
};
use observability::ProbeOutcome;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::estimator::ClockSyncEstimator;

/// Responder timestamp plus local receipt time of a matched pong
#[derive(Debug, Clone, Copy)]
struct PongReceipt {
    reply_nanos: i64,
    t4: i64,
}

/// Sends pings and matches pongs by their echoed t1
///
/// Pongs are fed in through [`handle_pong`](Self::handle_pong) by whatever
/// consumes transport events, so a probe in flight never blocks that
/// consumer.
pub struct ClockSyncProber {
    transport: Arc<dyn MessageTransport>,
    clock: Arc<dyn Clock>,
    pending: Mutex<HashMap<i64, oneshot::Sender<PongReceipt>>>,
    /// Bumped by `cancel_all`; batches started before the bump stop
    epoch: AtomicU64,
}

impl ClockSyncProber {
    pub fn new(transport: Arc<dyn MessageTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            clock,
            pending: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Number of probes awaiting a pong
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run one ping/pong exchange
    ///
    /// # Errors
    /// - `Timeout` when no matching pong arrives within `timeout`
    /// - `ProbeCancelled` when [`cancel_all`](Self::cancel_all) ran first
    pub async fn probe(
        &self,
        peer: &PeerId,
        timeout: Duration,
    ) -> Result<ClockOffsetEstimate, ContractError> {
        let (tx, rx) = oneshot::channel();

        let t1 = {
            let mut pending = self.pending.lock();
            // echo values must be unique among in-flight probes
            let mut t1 = self.clock.now_nanos();
            while pending.contains_key(&t1) {
                t1 = t1.wrapping_add(1);
            }
            pending.insert(t1, tx);
            t1
        };

        self.transport
            .send_message(peer, MessagePath::Ping, codec::encode_ping(t1));

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(receipt)) => {
                let probe = ClockSyncProbe {
                    t1,
                    t2: receipt.reply_nanos,
                    t3: receipt.reply_nanos,
                    t4: receipt.t4,
                };
                let estimate = probe.estimate();
                debug!(
                    peer = %peer,
                    offset_nanos = estimate.offset_nanos,
                    round_trip_nanos = estimate.round_trip_delay_nanos,
                    "probe answered"
                );
                Ok(estimate)
            }
            Ok(Err(_)) => Err(ContractError::ProbeCancelled {
                peer: peer.to_string(),
            }),
            Err(_) => {
                self.pending.lock().remove(&t1);
                Err(ContractError::Timeout {
                    peer: peer.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Run a batch of probes and keep the minimum-delay estimate
    ///
    /// Timed-out probes are not retried.
    ///
    /// # Errors
    /// - `ClockSyncUnavailable` when no probe was usable
    /// - `ProbeCancelled` when the batch was cancelled midway
    #[instrument(
        name = "clock_sync_probe_batch",
        skip(self, config),
        fields(peer = %peer, probes = config.probe_count)
    )]
    pub async fn probe_batch(
        &self,
        peer: &PeerId,
        config: &ClockSyncConfig,
    ) -> Result<ClockOffsetEstimate, ContractError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut estimator = ClockSyncEstimator::new(config.max_round_trip_nanos());

        for i in 0..config.probe_count {
            if i > 0 && !config.probe_interval().is_zero() {
                tokio::time::sleep(config.probe_interval()).await;
            }
            if self.epoch.load(Ordering::SeqCst) != epoch {
                observability::record_probe_outcome(ProbeOutcome::Cancelled);
                return Err(ContractError::ProbeCancelled {
                    peer: peer.to_string(),
                });
            }

            match self.probe(peer, config.probe_timeout()).await {
                Ok(estimate) => {
                    if estimator.record(estimate) {
                        observability::record_probe_outcome(ProbeOutcome::Answered);
                    } else {
                        debug!(
                            round_trip_nanos = estimate.round_trip_delay_nanos,
                            "probe discarded as outlier"
                        );
                        observability::record_probe_outcome(ProbeOutcome::Outlier);
                    }
                }
                Err(e) if e.is_recoverable() => {
                    debug!(error = %e, "probe timed out");
                    observability::record_probe_outcome(ProbeOutcome::TimedOut);
                    estimator.record_timeout();
                }
                Err(e) => {
                    observability::record_probe_outcome(ProbeOutcome::Cancelled);
                    return Err(e);
                }
            }
        }

        let answered = estimator.answered();
        let timed_out = estimator.timed_out();
        let estimate = estimator.finish(peer.as_str())?;

        observability::record_clock_estimate(&estimate);
        info!(
            offset_nanos = estimate.offset_nanos,
            round_trip_nanos = estimate.round_trip_delay_nanos,
            answered,
            timed_out,
            "clock offset estimated"
        );
        Ok(estimate)
    }

    /// Match a pong to its probe
    ///
    /// Unknown or late echoes are dropped.
    ///
    /// # Errors
    /// `MalformedPayload` if the pong does not decode.
    pub fn handle_pong(&self, payload: &[u8]) -> Result<(), ContractError> {
        let t4 = self.clock.now_nanos();
        let pong = codec::decode_pong(payload)?;

        let Some(tx) = self.pending.lock().remove(&pong.echo_t1) else {
            debug!(echo_t1 = pong.echo_t1, "pong for unknown or expired probe");
            return Ok(());
        };

        if tx
            .send(PongReceipt {
                reply_nanos: pong.reply_nanos,
                t4,
            })
            .is_err()
        {
            debug!(echo_t1 = pong.echo_t1, "probe gave up before its pong arrived");
        }
        Ok(())
    }

    /// Abandon every in-flight probe and any running batch
    pub fn cancel_all(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let dropped = {
            let mut pending = self.pending.lock();
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            warn!(dropped, "cancelled in-flight clock probes");
        }
    }
}
