//! PhoneNode - the receiving device
//!
//! Transport callbacks only enqueue; a single message loop task applies
//! every event in arrival order, so appends into the open recording never
//! interleave.

use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use bytes::Bytes;
use clock_sync::ClockSyncProber;
use contracts::{
    Clock, ClockCorrection, ClockSyncConfig, CloseReason, ContractError, DatasetSink, ExportConfig,
    IncomingMessage, LinkConfig, MessagePath, MessageTransport, NewRecording, PeerId, RecordStore,
    Recording, RecordingId, SessionConfig, TransportEvent,
};
use dataset::DatasetExporter;
use parking_lot::Mutex as SyncMutex;
use session::{ReceiverSession, ReceiverState};
use stream::{DemuxStats, Demultiplexer};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

/// Items consumed by the message loop
enum Inbound {
    Event(TransportEvent),
    Stop(oneshot::Sender<Result<Option<Recording>, ContractError>>),
    /// Answered once everything queued before it was handled
    Barrier(oneshot::Sender<()>),
}

#[derive(Default)]
struct PhoneState {
    session: ReceiverSession,
    demux: Option<Demultiplexer>,
    /// Counters of the most recently closed recording
    last_stats: DemuxStats,
    /// Peers the transport reported gone and not back yet
    unreachable: HashSet<PeerId>,
}

struct PhoneShared<S> {
    transport: Arc<dyn MessageTransport>,
    clock: Arc<dyn Clock>,
    store: Arc<S>,
    prober: ClockSyncProber,
    clock_sync: ClockSyncConfig,
    session: SessionConfig,
    export: ExportConfig,
    state: Mutex<PhoneState>,
}

impl<S: RecordStore + Sync + 'static> PhoneShared<S> {
    async fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Message(msg) => self.on_message(msg).await,
            TransportEvent::PeerReachable(peer) => {
                debug!(peer = %peer, "peer reachable");
                self.state.lock().await.unreachable.remove(&peer);
            }
            TransportEvent::PeerUnreachable(peer) => {
                let mut state = self.state.lock().await;
                state.unreachable.insert(peer.clone());
                if state.session.peer() != Some(&peer) {
                    return;
                }
                warn!(peer = %peer, "active peer unreachable");
                self.prober.cancel_all();
                if let Err(e) = self.close(&mut state, &peer, CloseReason::Disconnected).await {
                    error!(error = %e, "failed to close recording after disconnect");
                }
            }
        }
    }

    async fn on_message(&self, msg: IncomingMessage) {
        let peer = match PeerId::parse(&msg.source) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "message from invalid peer id dropped");
                return;
            }
        };

        match MessagePath::from_str(&msg.path) {
            Ok(MessagePath::Pong) => {
                if let Err(e) = self.prober.handle_pong(&msg.payload) {
                    warn!(peer = %peer, error = %e, "dropping incoming message");
                    observability::record_payload_rejected(&msg.path);
                }
            }
            Ok(MessagePath::StopTransfer) => {
                let mut state = self.state.lock().await;
                if state.session.peer() == Some(&peer) {
                    // a start still arming with this peer fails fast
                    self.prober.cancel_all();
                }
                if let Err(e) = self.close(&mut state, &peer, CloseReason::PeerStopped).await {
                    error!(error = %e, "failed to close recording after peer stop");
                }
            }
            Ok(path @ (MessagePath::Ping | MessagePath::InitTransfer)) => {
                debug!(peer = %peer, path = %path, "ignored on phone");
            }
            // data paths and unknown paths both go through the demultiplexer
            _ => self.on_data(&peer, &msg).await,
        }
    }

    async fn on_data(&self, peer: &PeerId, msg: &IncomingMessage) {
        let mut state = self.state.lock().await;
        let PhoneState { session, demux, .. } = &mut *state;

        let (Some(active), Some(demux)) = (session.active(), demux.as_mut()) else {
            trace!(peer = %peer, path = %msg.path, "no open recording, message dropped");
            return;
        };
        if active.peer != *peer {
            debug!(peer = %peer, active = %active.peer, "message from inactive peer dropped");
            return;
        }

        demux.dispatch(&msg.path, &msg.payload);

        if demux.streams().pending_len() >= self.session.persist_batch_size {
            let batch = demux.streams_mut().drain();
            if let Err(e) = self.store.insert_samples(active.recording_id, &batch).await {
                error!(recording = %active.recording_id, error = %e, lost = batch.len(), "persist failed");
            } else {
                trace!(recording = %active.recording_id, samples = batch.len(), "batch persisted");
            }
        }
    }

    /// End the session of `peer`, flush and close its recording
    ///
    /// Returns `None` when `peer` had no open recording. The recording is
    /// closed even when the final flush fails; that error is returned
    /// afterwards.
    async fn close(
        &self,
        state: &mut PhoneState,
        peer: &PeerId,
        reason: CloseReason,
    ) -> Result<Option<Recording>, ContractError> {
        let ended = match reason {
            CloseReason::Disconnected => state.session.disconnect(peer),
            CloseReason::Stopped | CloseReason::PeerStopped => state.session.stop(peer),
        };
        let Some(active) = ended else {
            return Ok(None);
        };

        let demux = state.demux.take();
        let stats = demux.as_ref().map(|d| d.stats()).unwrap_or_default();
        state.last_stats = stats;
        let rest = demux
            .map(|mut d| d.streams_mut().take_all())
            .unwrap_or_default();
        let flushed = if rest.is_empty() {
            Ok(())
        } else {
            self.store.insert_samples(active.recording_id, &rest).await
        };
        if let Err(e) = &flushed {
            error!(
                recording = %active.recording_id,
                error = %e,
                lost = rest.len(),
                "final flush failed, closing anyway"
            );
        }

        let mut recording = self
            .store
            .get_by_id(active.recording_id)
            .await?
            .ok_or(ContractError::RecordingNotFound(active.recording_id))?;
        recording.close(reason, self.clock.now_nanos(), self.clock.wall_millis());
        self.store.update(recording.clone()).await?;

        observability::record_recording_closed(reason, recording.sample_count);
        info!(
            recording = %recording.id,
            reason = reason.as_str(),
            samples = recording.sample_count,
            rejected = stats.rejected,
            out_of_order = stats.out_of_order,
            "recording closed"
        );
        flushed?;
        Ok(Some(recording))
    }

    /// `None` when the session was still probing and no recording existed
    async fn stop(&self) -> Result<Option<Recording>, ContractError> {
        let mut state = self.state.lock().await;
        let Some(peer) = state.session.peer().cloned() else {
            return Err(ContractError::NotStreaming);
        };

        self.prober.cancel_all();
        if state.session.disarm().is_some() {
            info!(peer = %peer, "recording start cancelled");
            return Ok(None);
        }

        self.transport
            .send_message(&peer, MessagePath::StopTransfer, Bytes::new());
        self.close(&mut state, &peer, CloseReason::Stopped).await
    }

    async fn run(self: Arc<Self>, rx: Receiver<Inbound>) {
        debug!("phone message loop started");
        while let Ok(item) = rx.recv().await {
            match item {
                Inbound::Event(event) => self.on_event(event).await,
                Inbound::Stop(reply) => {
                    let _ = reply.send(self.stop().await);
                }
                Inbound::Barrier(reply) => {
                    let _ = reply.send(());
                }
            }
        }

        // detached: end whatever is still open
        if self.state.lock().await.session.peer().is_some() {
            match self.stop().await {
                Ok(Some(recording)) => {
                    info!(recording = %recording.id, "recording stopped on shutdown")
                }
                Ok(None) => debug!("recording start cancelled on shutdown"),
                Err(e) => error!(error = %e, "failed to stop recording on shutdown"),
            }
        }
        debug!("phone message loop finished");
    }
}

/// Receiving side
///
/// Must be created inside a tokio runtime.
pub struct PhoneNode<S> {
    shared: Arc<PhoneShared<S>>,
    inbound: Sender<Inbound>,
    inbound_dropped: Arc<AtomicU64>,
    worker: SyncMutex<Option<JoinHandle<()>>>,
}

impl<S: RecordStore + Sync + 'static> PhoneNode<S> {
    /// Listen on `transport` and start the message loop
    pub fn spawn(
        transport: Arc<dyn MessageTransport>,
        clock: Arc<dyn Clock>,
        store: Arc<S>,
        config: &LinkConfig,
    ) -> Self {
        let (tx, rx) = async_channel::bounded(config.session.inbound_queue_capacity);
        let inbound_dropped = Arc::new(AtomicU64::new(0));

        let callback_tx = tx.clone();
        let dropped = inbound_dropped.clone();
        transport.listen(Arc::new(move |event| {
            match callback_tx.try_send(Inbound::Event(event)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    observability::record_inbound_dropped();
                    trace!("inbound queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    trace!("phone stopped, event dropped");
                }
            }
        }));

        let shared = Arc::new(PhoneShared {
            prober: ClockSyncProber::new(transport.clone(), clock.clone()),
            transport,
            clock,
            store,
            clock_sync: config.clock_sync.clone(),
            session: config.session.clone(),
            export: config.export.clone(),
            state: Mutex::new(PhoneState::default()),
        });
        let worker = tokio::spawn(shared.clone().run(rx));

        info!(
            id = %shared.transport.local_id(),
            queue = config.session.inbound_queue_capacity,
            "phone node listening"
        );
        Self {
            shared,
            inbound: tx,
            inbound_dropped,
            worker: SyncMutex::new(Some(worker)),
        }
    }

    /// Probe `peer`'s clock, create a recording and ask `peer` to stream
    ///
    /// Sample traffic keeps flowing through the message loop while the
    /// probes are in flight.
    ///
    /// # Errors
    /// - `UnreachablePeer` when the transport last reported `peer` gone
    /// - `SessionBusy` when a session is already armed or streaming
    /// - `ClockSyncUnavailable` when no probe succeeded and sync is required
    /// - `ProbeCancelled` when the session was torn down while probing
    #[instrument(name = "phone_start_recording", skip(self, peer), fields(peer = %peer))]
    pub async fn start_recording(
        &self,
        peer: &PeerId,
        title: &str,
    ) -> Result<Recording, ContractError> {
        {
            let mut state = self.shared.state.lock().await;
            if state.unreachable.contains(peer) {
                return Err(ContractError::UnreachablePeer {
                    peer: peer.to_string(),
                });
            }
            state.session.arm(peer)?;
        }

        let correction = match self.shared.prober.probe_batch(peer, &self.shared.clock_sync).await {
            Ok(estimate) => ClockCorrection::Synchronized(estimate),
            Err(ContractError::ClockSyncUnavailable { attempted, .. })
                if !self.shared.clock_sync.require_sync =>
            {
                warn!(attempted, "clock sync unavailable, recording unsynchronized");
                ClockCorrection::Unsynchronized
            }
            Err(e) => {
                let mut state = self.shared.state.lock().await;
                if matches!(state.session.state(), ReceiverState::Armed { peer: p } if p == peer) {
                    state.session.disarm();
                }
                return Err(e);
            }
        };

        let mut state = self.shared.state.lock().await;
        if !matches!(state.session.state(), ReceiverState::Armed { peer: p } if p == peer) {
            return Err(ContractError::ProbeCancelled {
                peer: peer.to_string(),
            });
        }

        let recording = self
            .shared
            .store
            .create(NewRecording {
                title: title.to_string(),
                peer: peer.clone(),
                clock: correction.estimate(),
                started_at_nanos: self.shared.clock.now_nanos(),
                started_at_millis: self.shared.clock.wall_millis(),
            })
            .await;
        let recording = match recording {
            Ok(r) => r,
            Err(e) => {
                state.session.disarm();
                return Err(e);
            }
        };

        state
            .session
            .begin(peer, recording.id, recording.started_at_nanos)?;
        state.demux = Some(Demultiplexer::new(correction));
        self.shared
            .transport
            .send_message(peer, MessagePath::InitTransfer, Bytes::new());

        info!(
            recording = %recording.id,
            synchronized = recording.is_synchronized(),
            offset_nanos = ?recording.clock_offset_nanos,
            "recording started"
        );
        Ok(recording)
    }

    /// Ask the watch to stop and close the open recording
    ///
    /// Runs after every message already queued, so nothing received before
    /// the call is lost. A start still probing the watch is cancelled
    /// instead and `None` is returned.
    ///
    /// # Errors
    /// - `NotStreaming` when nothing is armed or open
    /// - the store's error when the final flush fails; the recording is
    ///   closed regardless
    pub async fn stop_recording(&self) -> Result<Option<Recording>, ContractError> {
        let (tx, rx) = oneshot::channel();
        self.inbound
            .send(Inbound::Stop(tx))
            .await
            .map_err(|_| ContractError::Other("phone message loop stopped".to_string()))?;
        rx.await
            .map_err(|_| ContractError::Other("phone message loop stopped".to_string()))?
    }

    /// Wait until every event queued so far has been handled
    pub async fn settle(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inbound.send(Inbound::Barrier(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn state(&self) -> ReceiverState {
        self.shared.state.lock().await.session.state().clone()
    }

    /// Demultiplexer counters of the open recording, or of the last
    /// closed one when idle
    pub async fn demux_stats(&self) -> DemuxStats {
        let state = self.shared.state.lock().await;
        state
            .demux
            .as_ref()
            .map(|d| d.stats())
            .unwrap_or(state.last_stats)
    }

    /// Events lost to a full inbound queue
    pub fn inbound_dropped(&self) -> u64 {
        self.inbound_dropped.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    /// Live list of recordings
    pub fn recordings(&self) -> watch::Receiver<Vec<Recording>> {
        self.shared.store.get_all()
    }

    pub fn exporter(&self) -> DatasetExporter<S> {
        DatasetExporter::from_config(self.shared.store.clone(), &self.shared.export)
    }

    /// Export a closed recording into the configured directory
    pub async fn export<K: DatasetSink>(
        &self,
        id: RecordingId,
        sink: &mut K,
    ) -> Result<Option<PathBuf>, ContractError> {
        self.exporter()
            .export(id, sink, &self.shared.export.directory)
            .await
    }

    /// Detach from the transport and finish the message loop
    ///
    /// An open recording is stopped and closed.
    #[instrument(name = "phone_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.shared.transport.unlisten();
        self.shared.prober.cancel_all();
        self.inbound.close();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = ?e, "phone message loop panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoopbackTransport, MemoryRecordStore, WatchNode};
    use contracts::{ManualClock, RecordingStatus, SensorKind, SensorSample, SyncedSample};
    use dataset::LogSink;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use stream::ScriptedSensorSource;

    /// Memory store whose sample writes can be switched to fail
    struct FlakyStore {
        inner: MemoryRecordStore,
        fail_inserts: AtomicBool,
    }

    impl RecordStore for FlakyStore {
        async fn create(&self, new: NewRecording) -> Result<Recording, ContractError> {
            self.inner.create(new).await
        }

        async fn get_by_id(&self, id: RecordingId) -> Result<Option<Recording>, ContractError> {
            self.inner.get_by_id(id).await
        }

        async fn insert_samples(
            &self,
            id: RecordingId,
            samples: &[SyncedSample],
        ) -> Result<(), ContractError> {
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(ContractError::store("disk full"));
            }
            self.inner.insert_samples(id, samples).await
        }

        async fn samples(&self, id: RecordingId) -> Result<Vec<SyncedSample>, ContractError> {
            self.inner.samples(id).await
        }

        async fn update(&self, recording: Recording) -> Result<(), ContractError> {
            self.inner.update(recording).await
        }

        fn get_all(&self) -> watch::Receiver<Vec<Recording>> {
            self.inner.get_all()
        }

        async fn delete_by_id(&self, id: RecordingId) -> Result<bool, ContractError> {
            self.inner.delete_by_id(id).await
        }
    }

    struct Rig<S = MemoryRecordStore> {
        phone: PhoneNode<S>,
        watch: Option<WatchNode>,
        watch_id: PeerId,
        watch_link: Arc<LoopbackTransport>,
        phone_link: Arc<LoopbackTransport>,
        hr: ScriptedSensorSource,
    }

    fn config(require_sync: bool) -> LinkConfig {
        let mut config = LinkConfig::default();
        config.clock_sync.probe_count = 3;
        config.clock_sync.probe_interval_ms = 0;
        config.clock_sync.probe_timeout_ms = 20;
        config.clock_sync.require_sync = require_sync;
        config.session.persist_batch_size = 2;
        config
    }

    fn rig(with_watch: bool, config: LinkConfig) -> Rig {
        rig_with(with_watch, config, Arc::new(MemoryRecordStore::new()))
    }

    fn rig_with<S: RecordStore + Sync + 'static>(
        with_watch: bool,
        config: LinkConfig,
        store: Arc<S>,
    ) -> Rig<S> {
        let watch_id = PeerId::parse("watch").unwrap();
        let phone_id = PeerId::parse("phone").unwrap();
        let (watch_link, phone_link) = LoopbackTransport::pair(watch_id.clone(), phone_id);

        let hr = ScriptedSensorSource::new(SensorKind::HeartRate);
        let watch = with_watch.then(|| {
            WatchNode::start(
                watch_link.clone(),
                Arc::new(ManualClock::new(6_000_000)),
                vec![Box::new(hr.clone())],
            )
        });
        let phone = PhoneNode::spawn(
            phone_link.clone(),
            Arc::new(ManualClock::new(1_000_000)),
            store,
            &config,
        );
        Rig {
            phone,
            watch,
            watch_id,
            watch_link,
            phone_link,
            hr,
        }
    }

    #[tokio::test]
    async fn test_record_with_offset() {
        let rig = rig(true, config(true));
        let recording = rig.phone.start_recording(&rig.watch_id, "run").await.unwrap();
        assert_eq!(recording.clock_offset_nanos, Some(5_000_000));
        assert!(rig.watch.as_ref().unwrap().is_streaming());

        for (i, ts) in [6_000_300, 6_000_100, 6_000_200].into_iter().enumerate() {
            assert!(rig.hr.emit(SensorSample::heart_rate(70 + i as i32, ts)));
        }

        let closed = rig.phone.stop_recording().await.unwrap().unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::Stopped));
        assert_eq!(closed.sample_count, 3);
        assert!(!rig.watch.as_ref().unwrap().is_streaming());
        assert_eq!(rig.phone.demux_stats().await.appended, 3);

        let stored = rig.phone.store().samples(closed.id).await.unwrap();
        let corrected: Vec<_> = stored.iter().map(|s| s.corrected_timestamp_nanos).collect();
        assert_eq!(corrected, vec![1_000_300, 1_000_100, 1_000_200]);
        assert!(stored.iter().all(|s| s.synchronized));
    }

    #[tokio::test]
    async fn test_unresponsive_peer_requires_sync() {
        let rig = rig(false, config(true));
        let err = rig
            .phone
            .start_recording(&rig.watch_id, "nothing")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::ClockSyncUnavailable { attempted: 3, .. }));
        assert_eq!(rig.phone.state().await, ReceiverState::Idle);
        assert!(rig.phone.recordings().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_unresponsive_peer_unsynchronized() {
        let rig = rig(false, config(false));
        let recording = rig.phone.start_recording(&rig.watch_id, "raw").await.unwrap();
        assert!(!recording.is_synchronized());
        assert!(matches!(rig.phone.state().await, ReceiverState::Streaming { .. }));
    }

    #[tokio::test]
    async fn test_second_peer_busy() {
        let rig = rig(true, config(true));
        rig.phone.start_recording(&rig.watch_id, "a").await.unwrap();

        let other = PeerId::parse("other-watch").unwrap();
        let err = rig.phone.start_recording(&other, "b").await.unwrap_err();
        assert!(matches!(err, ContractError::SessionBusy { .. }));
        assert!(matches!(
            rig.phone.state().await,
            ReceiverState::Streaming { ref peer, .. } if *peer == rig.watch_id
        ));
    }

    #[tokio::test]
    async fn test_disconnect_closes_recording() {
        let rig = rig(true, config(true));
        let recording = rig.phone.start_recording(&rig.watch_id, "lost").await.unwrap();
        rig.hr.emit(SensorSample::heart_rate(80, 6_000_500));

        rig.phone_link.set_link_up(false);
        rig.phone.settle().await;

        let closed = rig
            .phone
            .store()
            .get_by_id(recording.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, RecordingStatus::Closed);
        assert_eq!(closed.close_reason, Some(CloseReason::Disconnected));
        assert_eq!(closed.sample_count, 1);
        assert_eq!(rig.phone.state().await, ReceiverState::Idle);
        assert!(matches!(
            rig.phone.stop_recording().await,
            Err(ContractError::NotStreaming)
        ));
    }

    #[tokio::test]
    async fn test_peer_stop_closes_recording() {
        let rig = rig(true, config(true));
        let recording = rig.phone.start_recording(&rig.watch_id, "w").await.unwrap();

        rig.watch_link
            .send_raw(MessagePath::StopTransfer.as_str(), Bytes::new());
        rig.phone.settle().await;

        let closed = rig
            .phone
            .store()
            .get_by_id(recording.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::PeerStopped));
    }

    #[tokio::test]
    async fn test_shutdown_stops_open_recording() {
        let rig = rig(true, config(true));
        let recording = rig.phone.start_recording(&rig.watch_id, "s").await.unwrap();
        rig.phone.shutdown().await;

        let closed = rig
            .phone
            .store()
            .get_by_id(recording.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::Stopped));
    }

    /// Pings that would each wait five seconds for a pong
    fn slow_sync_config() -> LinkConfig {
        let mut config = config(true);
        config.clock_sync.probe_timeout_ms = 5_000;
        config
    }

    async fn wait_until_armed<S: RecordStore + Sync + 'static>(phone: &PhoneNode<S>) {
        while phone.state().await == ReceiverState::Idle {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_stop_while_arming_cancels_start() {
        let rig = rig(false, slow_sync_config());

        let both = async {
            tokio::join!(
                rig.phone.start_recording(&rig.watch_id, "never"),
                async {
                    wait_until_armed(&rig.phone).await;
                    rig.phone.stop_recording().await
                }
            )
        };
        let (started, stopped) = tokio::time::timeout(Duration::from_secs(2), both)
            .await
            .unwrap();

        assert!(matches!(started, Err(ContractError::ProbeCancelled { .. })));
        assert!(stopped.unwrap().is_none());
        assert_eq!(rig.phone.state().await, ReceiverState::Idle);
        assert!(rig.phone.recordings().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_peer_stop_while_arming_fails_fast() {
        let rig = rig(false, slow_sync_config());

        let both = async {
            tokio::join!(
                rig.phone.start_recording(&rig.watch_id, "never"),
                async {
                    wait_until_armed(&rig.phone).await;
                    rig.watch_link
                        .send_raw(MessagePath::StopTransfer.as_str(), Bytes::new());
                }
            )
        };
        let (started, ()) = tokio::time::timeout(Duration::from_secs(2), both)
            .await
            .unwrap();

        assert!(matches!(started, Err(ContractError::ProbeCancelled { .. })));
        assert_eq!(rig.phone.state().await, ReceiverState::Idle);
    }

    #[tokio::test]
    async fn test_failed_final_flush_still_closes() {
        let store = Arc::new(FlakyStore {
            inner: MemoryRecordStore::new(),
            fail_inserts: AtomicBool::new(false),
        });
        let rig = rig_with(true, config(true), store.clone());
        let recording = rig.phone.start_recording(&rig.watch_id, "flaky").await.unwrap();

        // below the batch size, so it is only written at close
        assert!(rig.hr.emit(SensorSample::heart_rate(75, 6_000_100)));
        store.fail_inserts.store(true, Ordering::SeqCst);

        let err = rig.phone.stop_recording().await.unwrap_err();
        assert!(matches!(err, ContractError::Store { .. }));

        let closed = store.get_by_id(recording.id).await.unwrap().unwrap();
        assert_eq!(closed.status, RecordingStatus::Closed);
        assert_eq!(closed.close_reason, Some(CloseReason::Stopped));
        assert_eq!(closed.sample_count, 0);
        assert_eq!(rig.phone.state().await, ReceiverState::Idle);
        assert_eq!(rig.phone.demux_stats().await.appended, 1);

        let exported = rig
            .phone
            .export(recording.id, &mut LogSink::new("log"))
            .await
            .unwrap();
        assert!(exported.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_peer_rejected_until_back() {
        let rig = rig(true, config(true));
        rig.phone_link.set_link_up(false);
        rig.phone.settle().await;

        let err = rig
            .phone
            .start_recording(&rig.watch_id, "offline")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::UnreachablePeer { .. }));
        assert_eq!(rig.phone.state().await, ReceiverState::Idle);

        rig.phone_link.set_link_up(true);
        rig.phone.settle().await;
        rig.phone
            .start_recording(&rig.watch_id, "online")
            .await
            .unwrap();
    }
}
