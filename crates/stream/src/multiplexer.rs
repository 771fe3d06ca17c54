//! Watch-side fan-in of sensor sources onto the transport.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{MessageTransport, SampleCallback, SensorKind, SensorSource, TaggedSample};
use session::SenderSession;
use tracing::{debug, info, instrument, trace};

/// Multiplexer counters
#[derive(Debug, Default)]
pub struct MultiplexerStats {
    /// Samples handed to the transport
    pub forwarded: AtomicU64,

    /// Samples produced while no session was active
    pub dropped_no_destination: AtomicU64,
}

impl MultiplexerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped_no_destination.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MultiplexerSnapshot {
        MultiplexerSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped_no_destination: self.dropped_no_destination.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`MultiplexerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiplexerSnapshot {
    pub forwarded: u64,
    pub dropped_no_destination: u64,
}

/// Shared by every source callback
struct Forwarder {
    session: Arc<SenderSession>,
    transport: Arc<dyn MessageTransport>,
    stats: Arc<MultiplexerStats>,
}

impl Forwarder {
    fn forward(&self, tagged: TaggedSample) {
        let kind = tagged.kind;
        let sent = self.session.with_destination(|peer| {
            self.transport
                .send_message(peer, kind.path(), codec::encode(&tagged.sample));
        });

        match sent {
            Some(()) => {
                self.stats.record_forwarded();
                observability::record_sample_forwarded(kind);
                trace!(kind = %kind, ts = tagged.sample.timestamp_nanos(), "sample forwarded");
            }
            None => {
                self.stats.record_dropped();
                observability::record_sample_dropped(kind, "no_destination");
            }
        }
    }
}

/// Sends every sample of the registered sources to the session destination
///
/// One message per sample, no batching or queueing; whatever the
/// transport loses is lost.
pub struct Multiplexer {
    sources: BTreeMap<SensorKind, Box<dyn SensorSource>>,
    forwarder: Arc<Forwarder>,
}

impl Multiplexer {
    pub fn new(session: Arc<SenderSession>, transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            sources: BTreeMap::new(),
            forwarder: Arc::new(Forwarder {
                session,
                transport,
                stats: Arc::new(MultiplexerStats::new()),
            }),
        }
    }

    /// Register a source, replacing any previous source of the same kind
    pub fn register(&mut self, source: Box<dyn SensorSource>) {
        let kind = source.kind();
        if let Some(old) = self.sources.insert(kind, source) {
            old.stop();
        }
        debug!(kind = %kind, "registered sensor source");
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn kinds(&self) -> impl Iterator<Item = SensorKind> + '_ {
        self.sources.keys().copied()
    }

    pub fn stats(&self) -> Arc<MultiplexerStats> {
        self.forwarder.stats.clone()
    }

    /// Subscribe every source; already listening sources are left alone
    #[instrument(name = "multiplexer_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting sensor sources");
        for (kind, source) in &self.sources {
            if source.is_listening() {
                continue;
            }
            debug!(kind = %kind, "subscribing");
            let forwarder = self.forwarder.clone();
            let callback: SampleCallback = Arc::new(move |tagged| forwarder.forward(tagged));
            source.listen(callback);
        }
    }

    /// Unsubscribe every source
    #[instrument(name = "multiplexer_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping sensor sources");
        for (kind, source) in &self.sources {
            if source.is_listening() {
                debug!(kind = %kind, "unsubscribing");
                source.stop();
            }
        }
    }

    pub fn is_listening(&self, kind: SensorKind) -> bool {
        self.sources
            .get(&kind)
            .map(|s| s.is_listening())
            .unwrap_or(false)
    }

    /// Forward one sample directly, bypassing the sources
    pub fn forward(&self, tagged: TaggedSample) {
        self.forwarder.forward(tagged);
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        self.stop_all();
    }
}
